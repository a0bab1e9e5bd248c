use std::io;
use std::time::Duration;

use board_game_traits::{Color, Position as PositionTrait};

use tafl::position::{Move, Position};
use tafl::search::{Search, SearchSetting, TacticalHooks};
use tafl::{evaluation, position};

fn main() {
    println!("selfplay <seconds>: Watch the engine play against itself, with the given time per move");
    println!("analyze <seconds>: Analyze a position, provided as a list of moves from the start position");
    println!("perft <depth>: Count the leaf nodes of the move tree from the start position");
    loop {
        let mut input = String::new();
        match io::stdin().read_line(&mut input) {
            Ok(0) => break,
            Ok(_) => (),
            Err(err) => {
                eprintln!("Failed to read from stdin: {}", err);
                break;
            }
        }
        let words = input.split_whitespace().collect::<Vec<_>>();
        if words.is_empty() {
            continue;
        }
        match words[0] {
            "selfplay" => match parse_seconds(words.get(1)) {
                Ok(move_time) => selfplay(move_time),
                Err(err) => println!("{}", err),
            },
            "analyze" => match parse_seconds(words.get(1)) {
                Ok(move_time) => analyze_position_from_moves(move_time),
                Err(err) => println!("{}", err),
            },
            "perft" => match words.get(1).map(|depth| depth.parse::<u16>()) {
                Some(Ok(depth)) => {
                    let mut position = Position::start_position();
                    for d in 0..=depth {
                        println!("{}: {}", d, perft(&mut position, d));
                    }
                }
                _ => println!("Usage: perft <depth>"),
            },
            s => println!("Unknown option \"{}\"", s),
        }
    }
}

fn parse_seconds(word: Option<&&str>) -> Result<Duration, String> {
    let word = word.ok_or_else(|| "Missing number of seconds".to_string())?;
    word.parse::<f64>()
        .ok()
        .filter(|seconds| seconds.is_finite() && *seconds > 0.0)
        .map(Duration::from_secs_f64)
        .ok_or_else(|| format!("Invalid number of seconds \"{}\"", word))
}

fn search_for(move_time: Duration) -> Option<Search<'static, position::Tablut, TacticalHooks>> {
    match Search::with_settings(&position::Tablut, 2, move_time, SearchSetting::default()) {
        Ok(search) => Some(search.with_hooks(TacticalHooks)),
        Err(err) => {
            println!("Failed to start search: {}", err);
            None
        }
    }
}

fn selfplay(move_time: Duration) {
    let Some(mut search) = search_for(move_time) else {
        return;
    };
    let mut position = Position::start_position();
    let mut moves = vec![];
    while position.game_result().is_none() {
        let Some((best_move, score)) = search.make_decision(&position) else {
            break;
        };
        println!(
            "{}. {:?}: {} ({}, depth {})",
            moves.len() / 2 + 1,
            position.side_to_move(),
            best_move,
            score,
            search.depth_reached()
        );
        position.do_move(best_move);
        moves.push(best_move);
    }
    println!("{}", position);
    println!(
        "{}",
        moves
            .iter()
            .map(|mv| mv.to_string())
            .collect::<Vec<_>>()
            .join(" ")
    );
}

fn analyze_position_from_moves(move_time: Duration) {
    println!("Enter moves from the start position, separated by spaces (e3-h3 d1-d3 ...):");
    let mut input = String::new();
    if let Err(err) = io::stdin().read_line(&mut input) {
        println!("Failed to read moves: {}", err);
        return;
    }
    let mut position = Position::start_position();
    let mut legal_moves = vec![];
    for move_string in input.split_whitespace() {
        let mv = match move_string.parse::<Move>() {
            Ok(mv) => mv,
            Err(err) => {
                println!("{}", err);
                return;
            }
        };
        legal_moves.clear();
        position.generate_moves(&mut legal_moves);
        if !legal_moves.contains(&mv) {
            println!("Move {} is illegal in position\n{}", mv, position);
            return;
        }
        position.do_move(mv);
    }
    println!("{}", position);
    println!(
        "Static evaluation: {} for white, {} for black",
        evaluation::evaluate(&position, Color::White),
        evaluation::evaluate(&position, Color::Black)
    );
    if position.game_result().is_some() {
        return;
    }

    let Some(mut search) = search_for(move_time) else {
        return;
    };
    match search.make_decision(&position) {
        Some((best_move, score)) => {
            println!(
                "Best move {} with score {} for {:?}, depth {}",
                best_move,
                score,
                position.side_to_move(),
                search.depth_reached()
            );
            println!("{}", search.metrics());
        }
        None => println!("No legal moves"),
    }
}

fn perft(position: &mut Position, depth: u16) -> u64 {
    if depth == 0 {
        return 1;
    }
    let mut moves = vec![];
    position.generate_moves(&mut moves);
    if depth == 1 {
        return moves.len() as u64;
    }
    moves
        .into_iter()
        .map(|mv| {
            let reverse_move = position.do_move(mv);
            let count = perft(position, depth - 1);
            position.reverse_move(reverse_move);
            count
        })
        .sum()
}
