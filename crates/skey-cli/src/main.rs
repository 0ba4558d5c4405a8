//! Command-line interface for the secret-key engine.

#![forbid(unsafe_code)]

mod config;

use std::fs;
use std::path::{Path, PathBuf};

use anyhow::{bail, Context, Result};
use clap::{Parser, Subcommand, ValueEnum};
use rand::rngs::OsRng;
use rand::{CryptoRng, RngCore, SeedableRng};
use rand_chacha::ChaCha20Rng;
use skey_engine::{selftest, Algorithm, MgmFrame, Rc6Schedule, SecretKey};
use tracing_subscriber::EnvFilter;

/// Secret-key encryption, MAC and AEAD over RC6.
#[derive(Parser)]
#[command(name = "skey", version, author, about = "RC6 modes, CMAC and MGM")]
struct Cli {
    /// TOML file with key settings.
    #[arg(long, global = true, value_name = "FILE")]
    config: Option<PathBuf>,
    /// RC6 key schedule (overrides the config file).
    #[arg(long, global = true, value_enum)]
    schedule: Option<Schedule>,
    /// Block budget per key (overrides the config file).
    #[arg(long, global = true)]
    resource: Option<u64>,
    /// RNG seed for masks and demo data. Nonces always come from the OS.
    #[arg(long, global = true)]
    seed: Option<u64>,
    /// Log at debug level unless RUST_LOG says otherwise.
    #[arg(short, long, global = true)]
    verbose: bool,
    #[command(subcommand)]
    command: Commands,
}

#[derive(Clone, Copy, ValueEnum)]
enum Schedule {
    Reference,
    Keyed,
}

impl From<Schedule> for Rc6Schedule {
    fn from(schedule: Schedule) -> Self {
        match schedule {
            Schedule::Reference => Rc6Schedule::Reference,
            Schedule::Keyed => Rc6Schedule::Keyed,
        }
    }
}

#[derive(Clone, Copy, Debug, ValueEnum)]
enum Mode {
    Ecb,
    Cbc,
    Cfb,
    Ofb,
    Ctr,
}

#[derive(Subcommand)]
enum Commands {
    /// Encrypt a file with a chaining mode.
    Encrypt {
        #[arg(long, value_enum)]
        mode: Mode,
        /// 32-byte key as hex.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// IV as hex: half a block for CTR, whole blocks for CBC/CFB/OFB.
        #[arg(long, value_name = "HEX")]
        iv_hex: Option<String>,
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Decrypt a file with a chaining mode.
    Decrypt {
        #[arg(long, value_enum)]
        mode: Mode,
        /// 32-byte key as hex.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// IV used for encryption.
        #[arg(long, value_name = "HEX")]
        iv_hex: Option<String>,
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Print the CMAC of a file, or check it against an expected tag.
    Mac {
        /// 32-byte key as hex.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Tag length in bytes.
        #[arg(long, default_value_t = 16)]
        tag_len: usize,
        /// Expected tag as hex; the command fails on mismatch.
        #[arg(long, value_name = "HEX")]
        verify: Option<String>,
    },
    /// Encrypt and authenticate a file into an MGM frame.
    Seal {
        /// 32-byte encryption key as hex.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// Separate authentication key; defaults to the encryption key.
        #[arg(long, value_name = "HEX")]
        auth_key_hex: Option<String>,
        /// Nonce as hex with the top bit clear; random when omitted.
        #[arg(long, value_name = "HEX")]
        nonce_hex: Option<String>,
        /// Associated data as a UTF-8 string.
        #[arg(long, default_value = "")]
        associated_data: String,
        #[arg(long, default_value_t = 16)]
        tag_len: usize,
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        /// Output path for the serialized frame.
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Verify and decrypt an MGM frame.
    Open {
        /// 32-byte encryption key as hex.
        #[arg(long, value_name = "HEX")]
        key_hex: String,
        /// Separate authentication key used when sealing.
        #[arg(long, value_name = "HEX")]
        auth_key_hex: Option<String>,
        /// Path to the serialized frame.
        #[arg(long, value_name = "FILE")]
        input: PathBuf,
        #[arg(long, value_name = "FILE")]
        output: PathBuf,
    },
    /// Run the built-in known-answer tests.
    Selftest,
    /// Run a local demo: random key, every mode, MGM seal and open.
    Demo,
}

fn main() -> Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let overrides = config::Overrides {
        schedule: cli.schedule.map(Rc6Schedule::from),
        resource: cli.resource,
        seed: cli.seed,
    };
    let session = Session {
        config: config::load(cli.config.as_deref(), &overrides)?,
        seed: cli.seed,
    };

    match cli.command {
        Commands::Encrypt {
            mode,
            key_hex,
            iv_hex,
            input,
            output,
        } => session.cmd_mode(mode, true, &key_hex, iv_hex.as_deref(), &input, &output),
        Commands::Decrypt {
            mode,
            key_hex,
            iv_hex,
            input,
            output,
        } => session.cmd_mode(mode, false, &key_hex, iv_hex.as_deref(), &input, &output),
        Commands::Mac {
            key_hex,
            input,
            tag_len,
            verify,
        } => session.cmd_mac(&key_hex, &input, tag_len, verify.as_deref()),
        Commands::Seal {
            key_hex,
            auth_key_hex,
            nonce_hex,
            associated_data,
            tag_len,
            input,
            output,
        } => session.cmd_seal(
            &key_hex,
            auth_key_hex.as_deref(),
            nonce_hex.as_deref(),
            associated_data.as_bytes(),
            tag_len,
            &input,
            &output,
        ),
        Commands::Open {
            key_hex,
            auth_key_hex,
            input,
            output,
        } => session.cmd_open(&key_hex, auth_key_hex.as_deref(), &input, &output),
        Commands::Selftest => cmd_selftest(),
        Commands::Demo => session.cmd_demo(),
    }
}

fn init_tracing(verbose: bool) {
    let default = if verbose { "debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

/// Settings shared by every command.
struct Session {
    config: skey_engine::KeyConfig,
    seed: Option<u64>,
}

impl Session {
    fn key(&self, key_hex: &str) -> Result<SecretKey> {
        let key = decode_hex(key_hex, "key")?;
        let mut skey = SecretKey::create(Algorithm::Rc6, &self.config)?;
        skey.set_key(&key).context("install key")?;
        Ok(skey)
    }

    fn cmd_mode(
        &self,
        mode: Mode,
        encrypt: bool,
        key_hex: &str,
        iv_hex: Option<&str>,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut skey = self.key(key_hex)?;
        let data = read(input)?;
        let iv = match (mode, iv_hex) {
            (Mode::Ecb, None) => Vec::new(),
            (Mode::Ecb, Some(_)) => bail!("ECB takes no IV"),
            (_, Some(iv_hex)) => decode_hex(iv_hex, "IV")?,
            (_, None) => bail!("{mode:?} mode needs --iv-hex"),
        };
        let result = match (mode, encrypt) {
            (Mode::Ecb, true) => skey.encrypt_ecb(&data),
            (Mode::Ecb, false) => skey.decrypt_ecb(&data),
            (Mode::Cbc, true) => skey.encrypt_cbc(&data, &iv),
            (Mode::Cbc, false) => skey.decrypt_cbc(&data, &iv),
            (Mode::Cfb, true) => skey.encrypt_cfb(&data, &iv),
            (Mode::Cfb, false) => skey.decrypt_cfb(&data, &iv),
            (Mode::Ofb, _) => skey.ofb(&data, &iv),
            (Mode::Ctr, _) => skey.ctr(&data, &iv),
        };
        let out = result.with_context(|| format!("{mode:?} transform"))?;
        write(output, &out)
    }

    fn cmd_mac(
        &self,
        key_hex: &str,
        input: &Path,
        tag_len: usize,
        verify: Option<&str>,
    ) -> Result<()> {
        let mut skey = self.key(key_hex)?;
        let data = read(input)?;
        match verify {
            Some(tag_hex) => {
                let tag = decode_hex(tag_hex, "tag")?;
                skey.verify_cmac(&data, &tag).context("verify tag")?;
                println!("ok");
            }
            None => {
                let tag = skey.cmac(&data, tag_len).context("compute tag")?;
                println!("{}", hex::encode(tag));
            }
        }
        Ok(())
    }

    #[allow(clippy::too_many_arguments)]
    fn cmd_seal(
        &self,
        key_hex: &str,
        auth_key_hex: Option<&str>,
        nonce_hex: Option<&str>,
        associated_data: &[u8],
        tag_len: usize,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut skey = self.key(key_hex)?;
        let mut auth_key = auth_key_hex.map(|hex| self.key(hex)).transpose()?;
        let nonce = match nonce_hex {
            Some(nonce_hex) => decode_hex(nonce_hex, "nonce")?,
            None => random_nonce(&mut OsRng, skey.block_size()),
        };
        let data = read(input)?;
        let frame = MgmFrame::seal(
            &mut skey,
            auth_key.as_mut(),
            &nonce,
            associated_data,
            &data,
            tag_len,
        )
        .context("seal frame")?;
        let bytes = frame.to_bytes().context("serialize frame")?;
        write(output, &bytes)
    }

    fn cmd_open(
        &self,
        key_hex: &str,
        auth_key_hex: Option<&str>,
        input: &Path,
        output: &Path,
    ) -> Result<()> {
        let mut skey = self.key(key_hex)?;
        let mut auth_key = auth_key_hex.map(|hex| self.key(hex)).transpose()?;
        let frame = MgmFrame::from_bytes(&read(input)?).context("deserialize frame")?;
        let plaintext = frame
            .open(&mut skey, auth_key.as_mut())
            .context("open frame")?;
        write(output, &plaintext)
    }

    fn cmd_demo(&self) -> Result<()> {
        let mut rng = seeded_rng(self.seed);
        let mut skey = SecretKey::create(Algorithm::Rc6, &self.config)?;
        skey.set_key_random()?;

        let mut message = [0u8; 40];
        rng.fill_bytes(&mut message);
        let mut iv = [0u8; 16];
        rng.fill_bytes(&mut iv);
        println!("plaintext: {}", hex::encode(message));

        let ct = skey.ctr(&message, &iv[..8])?;
        check_round_trip("ctr", &ct, &skey.ctr(&ct, &iv[..8])?, &message)?;
        let ct = skey.ofb(&message, &iv)?;
        check_round_trip("ofb", &ct, &skey.ofb(&ct, &iv)?, &message)?;
        let ct = skey.encrypt_cfb(&message, &iv)?;
        check_round_trip("cfb", &ct, &skey.decrypt_cfb(&ct, &iv)?, &message)?;
        let ct = skey.encrypt_cbc(&message[..32], &iv)?;
        check_round_trip("cbc", &ct, &skey.decrypt_cbc(&ct, &iv)?, &message[..32])?;
        let ct = skey.encrypt_ecb(&message[..32])?;
        check_round_trip("ecb", &ct, &skey.decrypt_ecb(&ct)?, &message[..32])?;

        println!("cmac: {}", hex::encode(skey.cmac(&message, 16)?));

        let nonce = random_nonce(&mut OsRng, skey.block_size());
        let frame = MgmFrame::seal(&mut skey, None, &nonce, b"demo", &message, 16)?;
        println!("mgm tag: {}", hex::encode(&frame.tag));
        if frame.open(&mut skey, None)? != message {
            bail!("demo roundtrip failed for mgm");
        }
        println!("remaining budget: {} blocks", skey.resource());
        Ok(())
    }
}

fn cmd_selftest() -> Result<()> {
    selftest::run().context("known-answer tests")?;
    println!("all known-answer tests passed");
    Ok(())
}

fn check_round_trip(mode: &str, ct: &[u8], decrypted: &[u8], expected: &[u8]) -> Result<()> {
    println!("{mode}: {}", hex::encode(ct));
    if decrypted != expected {
        bail!("demo roundtrip failed for {mode}");
    }
    Ok(())
}

fn decode_hex(hex_str: &str, what: &str) -> Result<Vec<u8>> {
    hex::decode(hex_str.trim()).with_context(|| format!("decode {what} hex"))
}

fn read(path: &Path) -> Result<Vec<u8>> {
    fs::read(path).with_context(|| format!("read {}", path.display()))
}

fn write(path: &Path, bytes: &[u8]) -> Result<()> {
    fs::write(path, bytes).with_context(|| format!("write {}", path.display()))
}

/// A nonce of `len` random bytes with the top bit cleared.
fn random_nonce(rng: &mut impl RngCore, len: usize) -> Vec<u8> {
    let mut nonce = vec![0u8; len];
    rng.fill_bytes(&mut nonce);
    if let Some(last) = nonce.last_mut() {
        *last &= 0x7f;
    }
    nonce
}

fn seeded_rng(seed: Option<u64>) -> impl RngCore + CryptoRng {
    match seed {
        Some(value) => ChaCha20Rng::seed_from_u64(value),
        None => {
            let mut seed_bytes = [0u8; 32];
            OsRng.fill_bytes(&mut seed_bytes);
            ChaCha20Rng::from_seed(seed_bytes)
        }
    }
}
