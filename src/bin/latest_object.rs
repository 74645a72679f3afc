use clap::Parser;
use dotenvy::dotenv;
use s3_cross_account_copy::config::{DEFAULT_REGION, SessionNames, StorageConfig};
use s3_cross_account_copy::infrastructure::storage;
use s3_cross_account_copy::services::locator::find_latest_object;
use s3_cross_account_copy::utils::logging::init_tracing;
use s3_cross_account_copy::utils::validation::{validate_required, validate_role_arn};
use std::process::ExitCode;
use tracing::{error, info};

/// Report the most recently modified object under an S3 prefix without copying it
#[derive(Parser, Debug)]
#[command(author, version, about, long_about = None)]
struct Args {
    /// AWS IAM Role ARN to assume
    #[arg(long)]
    role_arn: String,

    /// S3 bucket name
    #[arg(long)]
    bucket: String,

    /// S3 prefix/path
    #[arg(long)]
    prefix: String,

    /// AWS region
    #[arg(long, default_value = DEFAULT_REGION)]
    region: String,

    /// Print the object as JSON
    #[arg(long)]
    json: bool,
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> ExitCode {
    dotenv().ok();
    let args = Args::parse();
    init_tracing("latest_object=info,s3_cross_account_copy=info");

    match run(&args).await {
        Ok(()) => ExitCode::SUCCESS,
        Err(e) => {
            error!("❌ Lookup failed: {}", e);
            println!("\nProcess failed: {}", e);
            ExitCode::FAILURE
        }
    }
}

async fn run(args: &Args) -> anyhow::Result<()> {
    validate_required(&[
        ("role ARN", args.role_arn.as_str()),
        ("bucket", args.bucket.as_str()),
        ("prefix", args.prefix.as_str()),
    ])?;
    validate_role_arn(&args.role_arn)?;

    let region = match args.region.trim() {
        "" => DEFAULT_REGION,
        region => region,
    };

    info!("🔍 Looking up latest object in s3://{}/{}", args.bucket, args.prefix);

    let connector = storage::setup_connector(region, &StorageConfig::from_env()).await;
    let bucket = connector
        .connect(&args.role_arn, &SessionNames::from_env().source, &args.bucket)
        .await?;
    let latest = find_latest_object(bucket.as_ref(), &args.prefix).await?;

    if args.json {
        println!("{}", serde_json::to_string_pretty(&latest)?);
    } else {
        println!("Key: {}", latest.object.key);
        println!("Last modified: {}", latest.object.last_modified);
        println!("Size: {} bytes", latest.object.size);
        println!("Objects scanned: {}", latest.object_count);
    }

    Ok(())
}
