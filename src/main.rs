use anyhow::Context;
use clap::Parser;
use truck_capture::cli::{Cli, Commands};
use truck_capture::config::Config;
use truck_capture::session;
use tracing_subscriber::EnvFilter;

fn init_tracing(verbose: bool) {
    let default = if verbose { "truck_capture=debug,truck_capture_common=debug" } else { "warn" };
    let filter = EnvFilter::try_from_default_env().unwrap_or_else(|_| EnvFilter::new(default));
    tracing_subscriber::fmt()
        .with_env_filter(filter)
        .with_writer(std::io::stderr)
        .init();
}

#[tokio::main(flavor = "current_thread")]
async fn main() -> anyhow::Result<()> {
    let cli = Cli::parse();
    init_tracing(cli.verbose);

    let mut config = Config::load().context("設定の読み込みに失敗しました")?;

    match cli.command {
        Commands::Inspect { frames, output } => {
            println!("🚚 truck-capture - トラック点検\n");
            let output = output.unwrap_or_else(|| config.output_dir());
            session::run_inspection(&frames, &output, config.capture.clone())
                .await
                .context("点検の撮影に失敗しました")?;
        }

        Commands::Document { frames, doc_type, name, pages, output } => {
            println!("📄 truck-capture - 書類撮影 ({})\n", doc_type.label());
            let output = output.unwrap_or_else(|| config.output_dir());
            session::run_document(&frames, &output, config.capture.clone(), doc_type, name, pages)
                .await
                .context("書類の撮影に失敗しました")?;
        }

        Commands::Config { show, set_quality, set_timeout, set_output } => {
            let mut changed = false;

            if let Some(quality) = set_quality {
                config.set_jpeg_quality(quality)?;
                println!("✔ JPEG品質: {}", quality);
                changed = true;
            }
            if let Some(timeout) = set_timeout {
                config.set_timeout_ms(timeout)?;
                println!("✔ タイムアウト: {}ms", timeout);
                changed = true;
            }
            if let Some(dir) = set_output {
                println!("✔ 出力先: {}", dir.display());
                config.output_dir = Some(dir);
                changed = true;
            }

            if changed {
                config.save().context("設定の保存に失敗しました")?;
                println!("✔ 設定を保存: {}", Config::config_path()?.display());
            }

            if show || !changed {
                println!("{}", serde_json::to_string_pretty(&config)?);
            }
        }
    }

    Ok(())
}
