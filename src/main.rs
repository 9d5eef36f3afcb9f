use anyhow::{Context, Result};
use clap::{Parser, Subcommand};
mod auth;
use layercrypt::{DEFAULT_ZSTD_LEVEL, KdfParams, Session, crypto, decrypt_file, encrypt_file};
use std::path::{Path, PathBuf};
use tracing_subscriber::EnvFilter;

const EXTENSION: &str = "lcry";

#[derive(Debug, clap::Args)]
struct Argon2Args {
    /// Argon2 memory cost in KiB (default: 65536)
    #[arg(long = "argon-mem", env = "LAYERCRYPT_ARGON_MEM")]
    mem_cost_kib: Option<u32>,

    /// Argon2 time cost / iterations (default: 3)
    #[arg(long = "argon-time", env = "LAYERCRYPT_ARGON_TIME")]
    time_cost: Option<u32>,

    /// Argon2 parallelism (default: 1)
    #[arg(long = "argon-parallelism", env = "LAYERCRYPT_ARGON_PARALLELISM")]
    parallelism: Option<u32>,
}

impl Argon2Args {
    fn to_kdf_params(&self) -> Result<KdfParams> {
        let default = KdfParams::default();

        Ok(KdfParams::new(
            self.mem_cost_kib.unwrap_or(default.mem_cost_kib()),
            self.time_cost.unwrap_or(default.time_cost()),
            self.parallelism.unwrap_or(default.parallelism()),
        )?)
    }
}

#[derive(Debug, Parser)]
#[command(name = "layercrypt")]
#[command(
    version,
    about = "Layered password-based file encryption (XChaCha20-Poly1305, Threefish, Serpent, AES)."
)]
struct Cli {
    /// Name recorded in logs for this session
    #[arg(long, global = true, env = "LAYERCRYPT_USER", default_value = "local")]
    user: String,

    #[command(subcommand)]
    command: Commands,
}

#[derive(Debug, Subcommand)]
enum Commands {
    /// Encrypts a file
    #[command(arg_required_else_help = true)]
    Encrypt {
        input: PathBuf,

        /// Output path (default: <INPUT>.lcry)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(long, default_value_t = false)]
        force: bool,

        /// zstd compression level applied before encryption
        #[arg(long, default_value_t = DEFAULT_ZSTD_LEVEL)]
        zstd_level: i32,

        #[command(flatten)]
        argon2: Argon2Args,
    },

    /// Decrypts a file
    #[command(arg_required_else_help = true)]
    Decrypt {
        input: PathBuf,

        /// Output path (default: <INPUT> without .lcry, or <INPUT>.out)
        #[arg(short, long, value_name = "PATH")]
        output: Option<PathBuf>,

        /// Overwrite an existing output file
        #[arg(long, default_value_t = false)]
        force: bool,
    },

    /// Shows header information of an encrypted file
    #[command(arg_required_else_help = true)]
    Info { input: PathBuf },
}

fn encrypted_path(input: &Path) -> PathBuf {
    let mut name = input.as_os_str().to_owned();
    name.push(".");
    name.push(EXTENSION);
    PathBuf::from(name)
}

fn decrypted_path(input: &Path) -> PathBuf {
    if input.extension().is_some_and(|e| e == EXTENSION) {
        input.with_extension("")
    } else {
        let mut name = input.as_os_str().to_owned();
        name.push(".out");
        PathBuf::from(name)
    }
}

fn init_tracing() {
    // stdout is left for command output
    tracing_subscriber::fmt()
        .with_env_filter(
            EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new("warn")),
        )
        .with_writer(std::io::stderr)
        .with_target(false)
        .init();
}

fn main() -> Result<()> {
    dotenvy::dotenv().ok();
    init_tracing();

    let args = Cli::parse();
    match args.command {
        Commands::Encrypt {
            input,
            output,
            force,
            zstd_level,
            argon2,
        } => {
            let kdf = argon2.to_kdf_params()?;
            let output = output.unwrap_or_else(|| encrypted_path(&input));
            let password = auth::read_password(true)?;
            let salt = crypto::generate_salt()?;

            let session = Session::new(args.user, password, &salt, kdf)?.with_zstd_level(zstd_level);
            encrypt_file(&session, &input, &output, force)?;
            println!("encrypted to {}", output.display());
        }
        Commands::Decrypt {
            input,
            output,
            force,
        } => {
            let output = output.unwrap_or_else(|| decrypted_path(&input));
            let password = auth::read_password(false)?;

            decrypt_file(&args.user, password, &input, &output, force)?;
            println!("decrypted to {}", output.display());
        }
        Commands::Info { input } => {
            let container = layercrypt::open_container(&input)
                .with_context(|| format!("cannot read {}", input.display()))?;
            let kdf = container.kdf();
            println!("format version: {}", container.version());
            println!(
                "argon2id: mem={} KiB, time={}, parallelism={}",
                kdf.mem_cost_kib(),
                kdf.time_cost(),
                kdf.parallelism()
            );
            println!("salt: {} bytes", container.salt().len());
            println!("payload: {} bytes", container.blob().len());
        }
    }

    Ok(())
}
