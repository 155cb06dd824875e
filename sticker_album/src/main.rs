//! Sticker Album Trading - Main Simulation
//!
//! Runs the baseline economy: ten friends collecting a 682-sticker album,
//! trading duplicates with each other and with strangers each round.

use sticker_album::market::Market;
use sticker_album::output::RunOutput;
use sticker_album::ModelConfig;

fn main() {
    println!("=== Sticker Album Trading Economy ===\n");

    let config = ModelConfig::baseline();
    let seed = 42;
    let log_interval = 10;

    println!("Configuration:");
    println!("  Friends: {}", config.n_friends);
    println!("  Album size: {}", config.n_stickers_in_album);
    println!("  Starting endowment: {}", config.starting_endowment);
    println!("  Stickers per pack: {}", config.stickers_per_pack);
    println!("  Strangers per round: {}", config.n_strangers);
    println!("  Stranger endowment: {}", config.stranger_endowment);
    println!("  Seed: {}\n", seed);

    let mut market = Market::new(config, seed).unwrap_or_else(|e| {
        eprintln!("Invalid configuration: {}", e);
        std::process::exit(1);
    });

    println!("Running simulation...\n");

    let summary = match market.run(log_interval) {
        Ok(summary) => summary,
        Err(e) => {
            eprintln!("Simulation aborted: {}", e);
            std::process::exit(1);
        }
    };

    println!("\n=== Results ===\n");
    println!("Rounds to completion: {}", summary.n_rounds);
    println!(
        "Finishers: {}/{}",
        summary.n_finished,
        market.members().len()
    );
    println!("Total money spent: {}", summary.total_money_spent);
    println!("Mean money spent: {:.1}", summary.mean_money_spent);

    println!("\nSample Collectors (first 5):");
    for (id, member) in market.members().iter().take(5).enumerate() {
        println!(
            "  Collector {}: album {}/{}, {} spare copies, {} spent",
            id,
            member.album_len(),
            member.n_stickers(),
            member.n_duplicates(),
            member.money_spent()
        );
    }

    let output = RunOutput::from_run(&market, &summary, seed);
    let output_dir = "results/single_run";
    if let Err(e) = output.write_all(output_dir) {
        eprintln!("Failed to write results: {}", e);
        std::process::exit(1);
    }
    println!("\nResults saved to: {}", output_dir);
}
