use clap::Parser;
use dotenvy::dotenv;
use s3_cross_account_copy::config::{
    BucketLocation, DEFAULT_REGION, SessionNames, StorageConfig, TransferConfig, default_local_dir,
};
use s3_cross_account_copy::infrastructure::storage;
use s3_cross_account_copy::models::TransferResult;
use s3_cross_account_copy::services::transfer::TransferService;
use s3_cross_account_copy::utils::logging::init_tracing;
use std::path::PathBuf;
use std::process::ExitCode;
use tracing::{error, info};

/// Copy the last modified object between S3 buckets across accounts
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// Source AWS IAM Role ARN to assume
    #[arg(long)]
    source_role_arn: String,

    /// Source S3 bucket name
    #[arg(long)]
    source_bucket: String,

    /// Source S3 prefix/path
    #[arg(long)]
    source_prefix: String,

    /// Destination AWS IAM Role ARN to assume
    #[arg(long)]
    dest_role_arn: String,

    /// Destination S3 bucket name
    #[arg(long)]
    dest_bucket: String,

    /// Destination S3 prefix/path
    #[arg(long)]
    dest_prefix: String,

    /// Local directory for temporary storage
    #[arg(long, default_value_os_t = default_local_dir())]
    local_dir: PathBuf,

    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Keep local file after upload
    #[arg(long)]
    no_cleanup: bool,

    /// Print the result as JSON instead of a summary
    #[arg(long)]
    json: bool,
}

impl Args {
    fn into_config(self, region: String) -> TransferConfig {
        TransferConfig {
            source: BucketLocation {
                role_arn: self.source_role_arn,
                bucket: self.source_bucket,
                prefix: self.source_prefix,
            },
            destination: BucketLocation {
                role_arn: self.dest_role_arn,
                bucket: self.dest_bucket,
                prefix: self.dest_prefix,
            },
            local_dir: self.local_dir,
            region,
            cleanup: !self.no_cleanup,
            session_names: SessionNames::from_env(),
        }
    }
}

fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();
    init_tracing("s3_cross_account_copy=info");

    let json = args.json;
    let mut region = args.region.trim().to_string();
    if region.is_empty() {
        region = DEFAULT_REGION.to_string();
    } else {
        // SAFETY: the runtime is not built yet, so no other thread reads the environment.
        unsafe { std::env::set_var("AWS_DEFAULT_REGION", &region) };
    }

    let runtime = match tokio::runtime::Builder::new_current_thread()
        .enable_all()
        .build()
    {
        Ok(runtime) => runtime,
        Err(e) => {
            error!("Failed to start runtime: {}", e);
            println!("\nProcess failed: {}", e);
            return ExitCode::FAILURE;
        }
    };

    let config = args.into_config(region);
    let result = runtime.block_on(run(config));
    report(&result, json)
}

async fn run(config: TransferConfig) -> TransferResult {
    let banner = "=".repeat(80);
    info!("{}", banner);
    info!("🚀 Starting S3 Cross-Account Copy Process");
    info!("{}", banner);

    info!("SOURCE:-");
    info!("  Role ARN: {}", config.source.role_arn);
    info!("  Bucket: {}", config.source.bucket);
    info!("  Prefix: {}", config.source.prefix);

    info!("DESTINATION:-");
    info!("  Role ARN: {}", config.destination.role_arn);
    info!("  Bucket: {}", config.destination.bucket);
    info!("  Prefix: {}", config.destination.prefix);

    info!("LOCAL TEMP DIR: {}", config.local_dir.display());
    info!("REGION: {}", config.region);
    info!("CLEANUP: {}", config.cleanup);
    info!("{}", banner);

    let storage_config = StorageConfig::from_env();
    let connector = storage::setup_connector(&config.region, &storage_config).await;
    let service = TransferService::new(connector);

    let result = service.copy_across_accounts(&config).await;

    info!("{}", banner);
    if result.success {
        info!("✅ Complete process finished successfully!");
        info!("File: {}", result.filename.as_deref().unwrap_or_default());
        info!("Destination: {}", result.destination_uri().unwrap_or_default());
        if result.local_file_cleaned {
            info!("Local temporary file cleaned up");
        }
    } else {
        error!(
            "❌ Process failed: {}",
            result.error.as_deref().unwrap_or("Unknown error")
        );
    }
    info!("{}", banner);

    result
}

fn report(result: &TransferResult, json: bool) -> ExitCode {
    if json {
        match serde_json::to_string_pretty(result) {
            Ok(body) => println!("{}", body),
            Err(e) => error!("Failed to serialize result: {}", e),
        }
    } else if result.success {
        println!("\nSuccess! Complete process finished successfully!");
        println!("File: {}", result.filename.as_deref().unwrap_or_default());
        println!(
            "Destination: {}",
            result.destination_uri().unwrap_or_default()
        );
    } else {
        println!(
            "\nProcess failed: {}",
            result.error.as_deref().unwrap_or("Unknown error")
        );
    }

    if result.success {
        ExitCode::SUCCESS
    } else {
        ExitCode::FAILURE
    }
}
