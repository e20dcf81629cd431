use clap::{Parser, Subcommand};
use std::path::PathBuf;
use truck_capture_common::DocumentType;

#[derive(Parser)]
#[command(name = "truck-capture")]
#[command(about = "トラック点検・書類撮影ツール", long_about = None)]
pub struct Cli {
    #[command(subcommand)]
    pub command: Commands,

    /// 詳細ログを出力
    #[arg(short, long, global = true)]
    pub verbose: bool,
}

#[derive(Subcommand)]
pub enum Commands {
    /// トラック点検（6箇所）を撮影
    Inspect {
        /// フレーム画像フォルダ（カメラの代わり）
        #[arg(short, long)]
        frames: PathBuf,

        /// 出力先ディレクトリ（デフォルト: 設定値）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 書類を複数ページ撮影
    Document {
        /// フレーム画像フォルダ（カメラの代わり）
        #[arg(short, long)]
        frames: PathBuf,

        /// 書類の種類 (bill-of-lading/manifest/inspection-report/other)
        #[arg(short = 't', long, default_value = "other")]
        doc_type: DocumentType,

        /// 書類名（デフォルト: 種類の名称）
        #[arg(short, long)]
        name: Option<String>,

        /// 指定枚数を連続撮影して終了（対話なし）
        #[arg(short, long)]
        pages: Option<usize>,

        /// 出力先ディレクトリ（デフォルト: 設定値）
        #[arg(short, long)]
        output: Option<PathBuf>,
    },

    /// 設定を表示・変更
    Config {
        /// 現在の設定を表示
        #[arg(long)]
        show: bool,

        /// JPEG品質 (0.0〜1.0)
        #[arg(long)]
        set_quality: Option<f32>,

        /// カメラ起動のタイムアウト（ミリ秒）
        #[arg(long)]
        set_timeout: Option<u64>,

        /// 出力先ディレクトリ
        #[arg(long)]
        set_output: Option<PathBuf>,
    },
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_parse_document() {
        let cli = Cli::parse_from([
            "truck-capture",
            "document",
            "--frames",
            "frames",
            "--doc-type",
            "bill-of-lading",
            "--pages",
            "3",
        ]);
        match cli.command {
            Commands::Document { doc_type, pages, name, .. } => {
                assert_eq!(doc_type, DocumentType::BillOfLading);
                assert_eq!(pages, Some(3));
                assert!(name.is_none());
            }
            _ => panic!("document expected"),
        }
    }

    #[test]
    fn test_parse_unknown_doc_type() {
        let result = Cli::try_parse_from([
            "truck-capture",
            "document",
            "--frames",
            "frames",
            "--doc-type",
            "invoice",
        ]);
        assert!(result.is_err());
    }
}
