use anyhow::{anyhow, bail, Context, Result};
use clap::Parser;
use forkscan::{perft, perft_divide, Position, START_FEN};
use log::info;
use shakmaty::fen::Fen;
use shakmaty::{CastlingMode, Chess, Position as _};

#[derive(Parser, Debug)]
#[command(author, version, about = "Count leaf nodes of the legal move tree", long_about = None)]
struct Args {
    #[arg(short, long, default_value_t = String::from(START_FEN))]
    fen: String,

    #[arg(short, long, default_value_t = 4)]
    depth: u8,

    /// Print the node count below each root move
    #[arg(long)]
    divide: bool,

    /// Cross-check the counts against shakmaty
    #[arg(long)]
    compare: bool,
}

fn main() -> Result<()> {
    env_logger::init();
    forkscan::init();
    let args = Args::parse();

    let pos = Position::from_fen(&args.fen).with_context(|| format!("bad FEN '{}'", args.fen))?;
    println!("Running perft on FEN: '{}' at depth {}", args.fen, args.depth);

    let start = std::time::Instant::now();
    let nodes = if args.divide {
        let split = perft_divide(&pos, args.depth);
        for (mv, count) in &split {
            println!("{}: {}", mv, count);
        }
        split.iter().map(|(_, count)| count).sum()
    } else {
        perft(&pos, args.depth)
    };
    let duration = start.elapsed();

    println!(
        "perft({}) = {} nodes ({} ms, {:.2} Mnps)",
        args.depth,
        nodes,
        duration.as_millis(),
        nodes as f64 / (duration.as_micros().max(1) as f64)
    );

    if args.compare {
        let fen: Fen = args.fen.parse().map_err(|e| anyhow!("shakmaty: {e}"))?;
        let oracle: Chess = fen
            .into_position(CastlingMode::Standard)
            .map_err(|e| anyhow!("shakmaty: {e}"))?;
        let expected = perft_shakmaty(&oracle, args.depth);
        info!("shakmaty perft({}) = {}", args.depth, expected);
        if expected != nodes {
            bail!("mismatch: got {} nodes, shakmaty counts {}", nodes, expected);
        }
        println!("shakmaty agrees");
    }

    Ok(())
}

fn perft_shakmaty(pos: &Chess, depth: u8) -> u64 {
    if depth == 0 {
        return 1;
    }

    let mut nodes = 0;
    for m in pos.legal_moves() {
        let mut new_pos = pos.clone();
        new_pos.play_unchecked(&m);
        nodes += perft_shakmaty(&new_pos, depth - 1);
    }
    nodes
}
