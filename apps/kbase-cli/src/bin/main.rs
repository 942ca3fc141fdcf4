use std::env;

use kbase_cli::{init_tracing, take_option, take_refresh, App};
use kbase_core::schema::SchemaFiles;
use kbase_core::types::Article;

const USAGE: &str = "Usage: kbase <init|index|get|delete|search> [args...]
  kbase init
  kbase index <title> <body> [--locale L] [--id ID] [--refresh true|false|wait_for]
  kbase get <id>
  kbase delete <id> [--refresh true|false|wait_for]
  kbase search <query> [--locale L] [--json]";

fn parse_args() -> (String, Vec<String>) {
    let mut args: Vec<String> = env::args().skip(1).collect();
    if args.is_empty() { eprintln!("{}", USAGE); std::process::exit(1); }
    let cmd = args.remove(0);
    (cmd, args)
}

fn main() -> anyhow::Result<()> {
    init_tracing();
    let app = App::load()?;
    let (cmd, mut args) = parse_args();
    let kb = app.connect()?;
    let default_refresh = app.settings.knowledge_base.refresh;
    match cmd.as_str() {
        "init" => {
            let schema = SchemaFiles::load(&app.settings.schema.index_mapping, &app.settings.schema.type_mapping)?;
            let outcome = kb.init_index(&schema);
            if outcome.success { println!("✅ {}", outcome.message); } else { eprintln!("❌ {}", outcome.message); std::process::exit(1); }
        }
        "index" => {
            let locale = take_option(&mut args, "--locale")?;
            let id = take_option(&mut args, "--id")?;
            let refresh = take_refresh(&mut args, default_refresh)?;
            let (Some(title), Some(body)) = (args.first(), args.get(1)) else { eprintln!("{}", USAGE); std::process::exit(1) };
            let mut article = Article::new(title.as_str(), body.as_str());
            article.locale = locale;
            let outcome = match &id { Some(id) => kb.index_with_id(id, &article, refresh), None => kb.index(&article, refresh) };
            match outcome.id {
                Some(id) => println!("✅ {} article {}", if outcome.created { "Created" } else { "Updated" }, id),
                None => { eprintln!("❌ Failed to index article"); std::process::exit(1); }
            }
        }
        "get" => {
            let Some(id) = args.first() else { eprintln!("{}", USAGE); std::process::exit(1) };
            match kb.get(id) {
                Some(article) => {
                    println!("📄 {}", article.title);
                    if let Some(locale) = &article.locale { println!("   locale: {}", locale); }
                    println!("\n{}", article.body);
                }
                None => { eprintln!("Article {} not found", id); std::process::exit(1); }
            }
        }
        "delete" => {
            let refresh = take_refresh(&mut args, default_refresh)?;
            let Some(id) = args.first() else { eprintln!("{}", USAGE); std::process::exit(1) };
            if kb.delete(id, refresh) { println!("🗑️  Deleted {}", id); } else { println!("Nothing deleted for {}", id); }
        }
        "search" => {
            let locale = take_option(&mut args, "--locale")?;
            let as_json = args.iter().any(|a| a == "--json");
            args.retain(|a| a != "--json");
            let query_text = args.join(" ");
            let results = kb.search(&query_text, locale.as_deref())?;
            if as_json {
                println!("{}", serde_json::to_string_pretty(&results)?);
            } else {
                println!("🔍 Found {} results for: \"{}\"", results.len(), query_text);
                for (i, result) in results.iter().enumerate() { println!("  {}. {}  id={}", i + 1, result.title, result.id); }
            }
        }
        _ => { eprintln!("Unknown command: {}\n{}", cmd, USAGE); std::process::exit(1); }
    }
    kb.close();
    Ok(())
}
