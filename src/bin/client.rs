//! Plays one game of Tablut against the tournament arbiter.

use std::error::Error;
use std::io;
use std::net::TcpStream;
use std::time::Duration;

use board_game_traits::{Color, GameResult, Position as PositionTrait};
use bufstream::BufStream;
use clap::{Arg, ArgAction, Command};
use log::{debug, error, info, warn};

use tafl::position::{Position, Tablut};
use tafl::protocol::{self, WHITE_DEFAULT_PORT, BLACK_DEFAULT_PORT};
use tafl::search::{Algorithm, Game, Search, SearchSetting, TacticalHooks, ZobristHash};

#[derive(Debug, Clone, PartialEq)]
struct ClientSettings {
    color: Color,
    name: String,
    move_time: Duration,
    start_depth: u16,
    strict: bool,
}

pub fn main() -> Result<(), Box<dyn Error>> {
    let matches = Command::new("Tafl arbiter client")
        .version("0.1")
        .arg(
            Arg::new("color")
                .env("TABLUT_COLOR")
                .help("Side to play")
                .num_args(1)
                .required(true)
                .value_parser(["white", "black"]),
        )
        .arg(
            Arg::new("time")
                .short('t')
                .long("time")
                .env("TABLUT_TIME")
                .help("Seconds the arbiter allows per move")
                .num_args(1)
                .default_value("60")
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("safetyMargin")
                .long("safety-margin")
                .env("TABLUT_SAFETY_MARGIN")
                .help("Seconds to keep in reserve for sending the move, subtracted from --time")
                .num_args(1)
                .default_value("4")
                .value_parser(clap::value_parser!(f64)),
        )
        .arg(
            Arg::new("host")
                .long("host")
                .env("TABLUT_HOST")
                .help("Address of the arbiter")
                .num_args(1)
                .default_value("localhost"),
        )
        .arg(
            Arg::new("port")
                .short('p')
                .long("port")
                .env("TABLUT_PORT")
                .help("Port of the arbiter. Defaults to 5800 for white and 5801 for black")
                .num_args(1)
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("name")
                .short('n')
                .long("name")
                .env("TABLUT_NAME")
                .help("Player name sent to the arbiter")
                .num_args(1)
                .default_value("tafl"),
        )
        .arg(
            Arg::new("algorithm")
                .long("algorithm")
                .env("TABLUT_ALGORITHM")
                .help("Search algorithm")
                .num_args(1)
                .value_parser(["alpha-beta", "table", "mtdf", "bns"])
                .default_value("table"),
        )
        .arg(
            Arg::new("threads")
                .long("threads")
                .env("TABLUT_THREADS")
                .help("Number of search threads. Defaults to one per core")
                .num_args(1)
                .value_parser(clap::value_parser!(u64).range(1..)),
        )
        .arg(
            Arg::new("startDepth")
                .long("start-depth")
                .env("TABLUT_START_DEPTH")
                .help("Depth of the first iterative deepening round")
                .num_args(1)
                .default_value("2")
                .value_parser(clap::value_parser!(u16)),
        )
        .arg(
            Arg::new("strict")
                .long("strict")
                .env("TABLUT_STRICT")
                .help("Exit if the arbiter's board disagrees with the result of our own move")
                .action(ArgAction::SetTrue)
                .num_args(0),
        )
        .arg(
            Arg::new("logfile")
                .short('l')
                .long("logfile")
                .env("LOGFILE")
                .value_name("tafl.log")
                .help("Name of debug logfile")
                .num_args(1),
        )
        .get_matches();

    let log_dispatcher = fern::Dispatch::new().format(|out, message, record| {
        out.finish(format_args!(
            "{}[{}][{}] {}",
            chrono::Local::now().format("[%Y-%m-%d][%H:%M:%S%.3f]"),
            record.target(),
            record.level(),
            message
        ))
    });

    if let Some(log_file) = matches.get_one::<String>("logfile") {
        log_dispatcher
            .chain(
                fern::Dispatch::new()
                    .level(log::LevelFilter::Debug)
                    .chain(fern::log_file(log_file)?),
            )
            .chain(
                fern::Dispatch::new()
                    .level(log::LevelFilter::Warn)
                    .chain(io::stderr()),
            )
            .apply()?
    } else {
        log_dispatcher
            .level(log::LevelFilter::Warn)
            .chain(io::stderr())
            .apply()?
    }

    let color = match matches.get_one::<String>("color").map(String::as_str) {
        Some("black") => Color::Black,
        _ => Color::White,
    };
    let move_time = search_time(
        Duration::from_secs(*matches.get_one::<u64>("time").unwrap_or(&60)),
        matches.get_one::<f64>("safetyMargin").copied().unwrap_or(4.0),
    )?;

    let algorithm = match matches.get_one::<String>("algorithm").map(String::as_str) {
        Some("alpha-beta") => Algorithm::AlphaBeta,
        Some("mtdf") => Algorithm::Mtdf,
        Some("bns") => Algorithm::BestNodeSearch,
        _ => Algorithm::AlphaBetaWithTable,
    };
    let mut search_setting = SearchSetting::default().algorithm(algorithm);
    if let Some(threads) = matches.get_one::<u64>("threads") {
        search_setting = search_setting.threads(*threads as usize);
    }

    let settings = ClientSettings {
        color,
        name: matches
            .get_one::<String>("name")
            .cloned()
            .unwrap_or_else(|| "tafl".to_string()),
        move_time,
        start_depth: *matches.get_one::<u16>("startDepth").unwrap_or(&2),
        strict: matches.get_flag("strict"),
    };

    let host = matches
        .get_one::<String>("host")
        .map(String::as_str)
        .unwrap_or("localhost");
    let port = matches
        .get_one::<u16>("port")
        .copied()
        .unwrap_or(match color {
            Color::White => WHITE_DEFAULT_PORT,
            Color::Black => BLACK_DEFAULT_PORT,
        });

    let game = Tablut;
    let mut search = Search::with_settings(&game, settings.start_depth, settings.move_time, search_setting)?
        .with_hooks(TacticalHooks);

    info!("Connecting to {}:{} as {:?}", host, port, color);
    let mut session = ArbiterSession::new(TcpStream::connect((host, port))?);
    protocol::send_name(&mut session.connection, &settings.name)?;

    match session.play_game(&settings, &mut search) {
        Ok(Some(result)) => {
            let outcome = match (result, color) {
                (GameResult::Draw, _) => "Draw",
                (GameResult::WhiteWin, Color::White) | (GameResult::BlackWin, Color::Black) => {
                    "We won"
                }
                _ => "We lost",
            };
            warn!("Game over: {:?}. {}", result, outcome);
            println!("{}: {:?}", outcome, result);
            Ok(())
        }
        Ok(None) => {
            warn!("Arbiter closed the connection before the game was over");
            Ok(())
        }
        Err(err) => {
            error!("Game aborted: {}", err);
            Err(err)
        }
    }
}

/// Time left for searching once the safety margin is reserved.
fn search_time(move_time: Duration, safety_margin: f64) -> Result<Duration, String> {
    if !safety_margin.is_finite() || safety_margin < 0.0 {
        return Err("--safety-margin must be a non-negative number of seconds".to_string());
    }
    let safety_margin = Duration::from_secs_f64(safety_margin);
    if move_time <= safety_margin {
        return Err(format!(
            "--time ({}s) must be larger than --safety-margin ({:.3}s)",
            move_time.as_secs_f64(),
            safety_margin.as_secs_f64()
        ));
    }
    Ok(move_time - safety_margin)
}

struct ArbiterSession {
    connection: BufStream<TcpStream>,
    /// Repetition history since the last capture, for the most recent position
    history: Vec<u64>,
    last_position: Option<Position>,
    /// Hash of the position our last move should have produced
    expected_hash: Option<u64>,
}

impl ArbiterSession {
    fn new(stream: TcpStream) -> Self {
        ArbiterSession {
            connection: BufStream::new(stream),
            history: vec![],
            last_position: None,
            expected_hash: None,
        }
    }

    /// Plays until the arbiter reports a result, or closes the connection.
    fn play_game(
        &mut self,
        settings: &ClientSettings,
        search: &mut Search<Tablut, TacticalHooks>,
    ) -> Result<Option<GameResult>, Box<dyn Error>> {
        loop {
            let Some(message) = protocol::read_state(&mut self.connection)? else {
                return Ok(None);
            };
            let mut position = message.to_position()?;
            self.carry_history(&mut position);
            debug!("Received position:\n{:?}", position);

            if let Some(expected_hash) = self.expected_hash.take() {
                if position.zobrist_hash() != expected_hash && position.game_result().is_none() {
                    if settings.strict {
                        return Err(format!(
                            "Arbiter's position does not match our last move:\n{}",
                            position
                        )
                        .into());
                    }
                    warn!("Arbiter's position does not match our last move:\n{}", position);
                }
            }

            if let Some(result) = message.turn.game_result() {
                return Ok(Some(result));
            }
            if position.side_to_move() != settings.color {
                continue;
            }

            let (best_move, score) = search
                .make_decision(&position)
                .ok_or("No legal moves in a position that is not over")?;
            info!(
                "Playing {} with score {} at depth {}",
                best_move,
                score,
                search.depth_reached()
            );
            debug!("{}", search.metrics());

            self.expected_hash = Some(Tablut.result(&position, &best_move).zobrist_hash());
            protocol::send_move(&mut self.connection, best_move, settings.color)?;
        }
    }

    /// The arbiter only sends boards, so the repetition history has to be rebuilt locally.
    /// A capture wipes it, like it does during search.
    fn carry_history(&mut self, position: &mut Position) {
        let captured = self.last_position.as_ref().is_some_and(|last| {
            last.white_soldiers() + last.black_soldiers()
                > position.white_soldiers() + position.black_soldiers()
        });
        if !captured {
            position.set_hash_history(self.history.clone());
        }
        self.history = position.hash_history().to_vec();
        self.last_position = Some(position.clone());
    }
}

#[test]
fn search_time_test() {
    assert_eq!(
        search_time(Duration::from_secs(60), 4.0),
        Ok(Duration::from_secs(56))
    );
    assert_eq!(
        search_time(Duration::from_secs(5), 0.5),
        Ok(Duration::from_millis(4500))
    );
    assert!(search_time(Duration::from_secs(3), 4.0)
        .unwrap_err()
        .contains("--safety-margin"));
    assert!(search_time(Duration::from_secs(4), 4.0).is_err());
    assert!(search_time(Duration::from_secs(60), -1.0).is_err());
    assert!(search_time(Duration::from_secs(60), f64::NAN).is_err());
}
