//! Print what a downloaded artifact pair contains.
//!
//! cargo run -p stylerag-index --example inspect -- /tmp/stylerag/my_faiss_mail.vec /tmp/stylerag/my_faiss_mail.json
use std::env;

use stylerag_index::artifact::decode;

fn main() -> anyhow::Result<()> {
    let args: Vec<String> = env::args().collect();
    if args.len() < 3 {
        eprintln!("Usage: {} <index.vec> <index.json> [--show N]", args[0]);
        std::process::exit(1);
    }
    let show = match args.get(3).map(String::as_str) {
        Some("--show") => args.get(4).and_then(|n| n.parse().ok()).unwrap_or(3),
        _ => 3,
    };
    let set = decode(&std::fs::read(&args[1])?, &std::fs::read(&args[2])?)?;
    println!("model: {}  dim: {}  fragments: {}", set.model, set.dim, set.fragments.len());
    for (i, fragment) in set.fragments.iter().take(show).enumerate() {
        let preview: String = fragment.content.chars().take(120).collect();
        println!("\n  {}. id={}  {:?}", i + 1, fragment.id, fragment.metadata);
        println!("     {}", preview.replace('\n', " "));
    }
    Ok(())
}
