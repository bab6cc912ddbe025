use crate::error::VerifyError;
use crate::preprocessing::Preset;
use crate::Args;
use std::path::PathBuf;
use std::time::Duration;

/// Server configuration
#[derive(Debug, Clone)]
pub struct Config {
    pub host: String,
    pub port: u16,
    pub max_file_size: usize,
    pub engine: Option<String>,
    pub language: String,
    pub preset: Preset,
    pub tesseract_path: String,
    pub pdftoppm_path: String,
    pub pdf_dpi: u32,
    pub request_timeout: Duration,
    pub max_concurrent: usize,
    pub upload_dir: Option<PathBuf>,
}

impl TryFrom<Args> for Config {
    type Error = VerifyError;

    fn try_from(args: Args) -> Result<Self, Self::Error> {
        let preset = Preset::parse(&args.preprocess).ok_or_else(|| {
            VerifyError::InvalidRequest(format!(
                "Unknown preprocessing preset: {}",
                args.preprocess
            ))
        })?;

        if args.pdf_dpi == 0 {
            return Err(VerifyError::InvalidRequest(
                "PDF resolution must be positive".to_string(),
            ));
        }

        if args.max_concurrent == 0 {
            return Err(VerifyError::InvalidRequest(
                "At least one concurrent verification is required".to_string(),
            ));
        }

        Ok(Self {
            host: args.host,
            port: args.port,
            max_file_size: args.max_file_size,
            engine: args.engine,
            language: args.language,
            preset,
            tesseract_path: args.tesseract_path,
            pdftoppm_path: args.pdftoppm_path,
            pdf_dpi: args.pdf_dpi,
            request_timeout: Duration::from_secs(args.request_timeout_secs),
            max_concurrent: args.max_concurrent,
            upload_dir: args.upload_dir,
        })
    }
}

#[cfg(test)]
impl Config {
    /// Configuration with the command-line defaults
    pub fn for_tests() -> Self {
        use clap::Parser;
        let args = Args::parse_from(["aadhaar-verify-server"]);
        Self::try_from(args).expect("default arguments are valid")
    }
}
