use std::env;
use std::path::PathBuf;

use indicatif::{ProgressBar, ProgressStyle};
use kbase_cli::{init_tracing, take_option, take_refresh, App};
use kbase_core::article_loader::ArticleLoader;
use kbase_core::types::BulkOp;

const DEFAULT_BATCH: usize = 500;

fn main() -> anyhow::Result<()> {
    init_tracing();
    let app = App::load()?;
    let mut args: Vec<String> = env::args().skip(1).collect();
    let limit = take_option(&mut args, "--limit")?.map(|l| l.parse::<usize>()).transpose().map_err(|e| anyhow::anyhow!("--limit requires a number: {}", e))?;
    let batch = take_option(&mut args, "--batch")?.map(|b| b.parse::<usize>()).transpose().map_err(|e| anyhow::anyhow!("--batch requires a number: {}", e))?.unwrap_or(DEFAULT_BATCH).max(1);
    let refresh = take_refresh(&mut args, app.settings.knowledge_base.refresh)?;
    let data_dir = args.iter().find(|a| !a.starts_with('-')).map(PathBuf::from).unwrap_or_else(|| app.articles_dir());

    println!("kbase bulk indexer\n==================");
    println!("Data directory: {}", data_dir.display());
    let loader = ArticleLoader::new();
    let articles = match limit {
        Some(limit) => { println!("🔢 Limiting to {} files", limit); loader.load_directory_limited(&data_dir, limit)? }
        None => loader.load_directory(&data_dir)?,
    };
    tracing::info!(articles = articles.len(), dir = %data_dir.display(), "loaded articles");
    if articles.is_empty() { println!("No articles found."); return Ok(()); }

    let kb = app.connect()?;
    let pb = ProgressBar::new(articles.len() as u64);
    pb.set_style(ProgressStyle::with_template("{bar:40} {pos}/{len} articles ({eta})")?);
    let (mut succeeded, mut failed) = (0usize, 0usize);
    for chunk in articles.chunks(batch) {
        let ops: Vec<BulkOp> = chunk.iter().cloned().map(|article| BulkOp::Index { id: None, article }).collect();
        let report = kb.bulk(&ops, refresh)?;
        succeeded += report.succeeded;
        failed += report.failures.len();
        for item in &report.failures { pb.println(format!("⚠️  {} failed ({}): {}", item.action.as_str(), item.status, item.error.as_deref().unwrap_or("unknown error"))); }
        pb.inc(chunk.len() as u64);
    }
    pb.finish_and_clear();
    kb.close();

    println!("\n✅ Indexing completed: {} indexed, {} failed", succeeded, failed);
    println!("💡 To search, use: cargo run --bin kbase search '<query>'");
    Ok(())
}
