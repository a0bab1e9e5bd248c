mod evaluation_tests;
mod tablut_tests;

use board_game_traits::{Color, Position as PositionTrait};
use rand::{Rng, SeedableRng};

use crate::position::{Move, Piece, Position, Square, BOARD_SIZE, NUM_SQUARES};
use crate::search::{Game, ZobristHash};

/// Parses a board diagram, with row 1 on top.
/// `B`, `W` and `K` are pieces, any other character is an empty square.
fn cells_from_diagram(diagram: &str) -> [Option<Piece>; NUM_SQUARES] {
    let rows: Vec<&str> = diagram
        .lines()
        .map(str::trim)
        .filter(|line| !line.is_empty())
        .collect();
    assert_eq!(rows.len(), BOARD_SIZE, "Diagram must have {} rows", BOARD_SIZE);
    let mut cells = [None; NUM_SQUARES];
    for (y, row) in rows.iter().enumerate() {
        assert_eq!(row.len(), BOARD_SIZE, "Bad diagram row \"{}\"", row);
        for (x, ch) in row.chars().enumerate() {
            cells[Square::from_xy(x as u8, y as u8).into_inner() as usize] = match ch {
                'B' => Some(Piece::Black),
                'W' => Some(Piece::White),
                'K' => Some(Piece::King),
                _ => None,
            };
        }
    }
    cells
}

fn position_from_diagram(diagram: &str, to_move: Color) -> Position {
    Position::from_cells(cells_from_diagram(diagram), to_move, None).unwrap()
}

fn legal_moves(position: &Position) -> Vec<Move> {
    let mut moves = vec![];
    position.generate_moves(&mut moves);
    moves
}

fn do_moves_and_check_validity(position: &mut Position, move_strings: &[&str]) {
    for move_string in move_strings {
        let mv: Move = move_string.parse().unwrap();
        let moves = legal_moves(position);
        assert!(
            moves.contains(&mv),
            "Move {} was not among legal moves: {:?}\n{:?}",
            mv,
            moves,
            position
        );
        position.do_move(mv);
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Side {
    Max,
    Min,
}

impl Side {
    fn other(self) -> Side {
        match self {
            Side::Max => Side::Min,
            Side::Min => Side::Max,
        }
    }
}

/// An explicit game tree, for checking the search against hand-computed values.
pub enum Tree {
    Leaf(i32),
    Node {
        value: i32,
        noisy: bool,
        children: Vec<Tree>,
    },
}

/// A terminal state, scored `value` from the max player's point of view.
pub fn leaf(value: i32) -> Tree {
    Tree::Leaf(value)
}

/// An inner state, with heuristic `value` from the max player's point of view.
pub fn node(value: i32, children: Vec<Tree>) -> Tree {
    Tree::Node {
        value,
        noisy: false,
        children,
    }
}

/// Like `node`, but the move leading here is not quiet.
pub fn noisy_node(value: i32, children: Vec<Tree>) -> Tree {
    Tree::Node {
        value,
        noisy: true,
        children,
    }
}

struct TreeNode {
    value: i32,
    noisy: bool,
    children: Vec<usize>,
}

/// A game played on a fixed tree. The max player moves at the root, and actions are child indices.
pub struct TreeGame {
    nodes: Vec<TreeNode>,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct TreeState {
    node: usize,
    to_move: Side,
}

impl ZobristHash for TreeState {
    fn zobrist_hash(&self) -> u64 {
        (self.node as u64 + 1).wrapping_mul(0x9E37_79B9_7F4A_7C15)
    }
}

pub const TREE_MIN: i32 = -100;
pub const TREE_MAX: i32 = 100;

impl TreeGame {
    pub fn new(tree: Tree) -> Self {
        let mut game = TreeGame { nodes: vec![] };
        game.add(tree);
        game
    }

    fn add(&mut self, tree: Tree) -> usize {
        let index = self.nodes.len();
        match tree {
            Tree::Leaf(value) => self.nodes.push(TreeNode {
                value,
                noisy: false,
                children: vec![],
            }),
            Tree::Node {
                value,
                noisy,
                children,
            } => {
                self.nodes.push(TreeNode {
                    value,
                    noisy,
                    children: vec![],
                });
                let children = children.into_iter().map(|child| self.add(child)).collect();
                self.nodes[index].children = children;
            }
        }
        index
    }

    /// A random tree with terminal leaves at `depth`. The root has exactly `max_branching` children, other inner nodes between 1 and `max_branching`.
    pub fn random(seed: u64, depth: u16, max_branching: usize) -> Self {
        assert!(depth >= 1 && max_branching >= 2);
        let mut rng = rand::rngs::StdRng::seed_from_u64(seed);
        let children = (0..max_branching)
            .map(|_| random_tree(&mut rng, depth - 1, max_branching))
            .collect();
        TreeGame::new(node(0, children))
    }

    pub fn root(&self) -> TreeState {
        TreeState {
            node: 0,
            to_move: Side::Max,
        }
    }

    pub fn num_nodes(&self) -> usize {
        self.nodes.len()
    }
}

fn random_tree(rng: &mut impl Rng, depth: u16, max_branching: usize) -> Tree {
    if depth == 0 {
        return leaf(rng.gen_range(-90..=90));
    }
    let num_children = rng.gen_range(1..=max_branching);
    node(
        rng.gen_range(-90..=90),
        (0..num_children)
            .map(|_| random_tree(rng, depth - 1, max_branching))
            .collect(),
    )
}

impl Game for TreeGame {
    type State = TreeState;
    type Action = usize;
    type Player = Side;
    type Utility = i32;

    fn initial_state(&self) -> TreeState {
        self.root()
    }

    fn player(&self, state: &TreeState) -> Side {
        state.to_move
    }

    fn actions(&self, state: &TreeState) -> Vec<usize> {
        (0..self.nodes[state.node].children.len()).collect()
    }

    fn result(&self, state: &TreeState, action: &usize) -> TreeState {
        TreeState {
            node: self.nodes[state.node].children[*action],
            to_move: state.to_move.other(),
        }
    }

    fn is_terminal(&self, state: &TreeState) -> bool {
        self.nodes[state.node].children.is_empty()
    }

    fn utility(&self, state: &TreeState, player: Side) -> i32 {
        let value = self.nodes[state.node].value;
        match player {
            Side::Max => value,
            Side::Min => -value,
        }
    }

    fn is_quiet(&self, _before: &TreeState, after: &TreeState) -> bool {
        !self.nodes[after.node].noisy
    }

    fn util_min(&self) -> i32 {
        TREE_MIN
    }

    fn util_max(&self) -> i32 {
        TREE_MAX
    }

    fn util_unknown(&self) -> i32 {
        i32::MIN
    }
}

/// A game that never ends: every state has three actions, and a pseudo-random heuristic score.
pub struct EndlessGame;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct EndlessState {
    path: u64,
    to_move: Side,
}

impl ZobristHash for EndlessState {
    fn zobrist_hash(&self) -> u64 {
        self.path
    }
}

impl Game for EndlessGame {
    type State = EndlessState;
    type Action = u8;
    type Player = Side;
    type Utility = i32;

    fn initial_state(&self) -> EndlessState {
        EndlessState {
            path: 1,
            to_move: Side::Max,
        }
    }

    fn player(&self, state: &EndlessState) -> Side {
        state.to_move
    }

    fn actions(&self, _state: &EndlessState) -> Vec<u8> {
        vec![0, 1, 2]
    }

    fn result(&self, state: &EndlessState, action: &u8) -> EndlessState {
        EndlessState {
            path: state
                .path
                .wrapping_mul(0x5851_F42D_4C95_7F2D)
                .wrapping_add(*action as u64 + 1),
            to_move: state.to_move.other(),
        }
    }

    fn is_terminal(&self, _state: &EndlessState) -> bool {
        false
    }

    fn utility(&self, state: &EndlessState, player: Side) -> i32 {
        let value = (state.path >> 40) as i32 % 50;
        match player {
            Side::Max => value,
            Side::Min => -value,
        }
    }

    fn util_min(&self) -> i32 {
        -100
    }

    fn util_max(&self) -> i32 {
        100
    }

    fn util_unknown(&self) -> i32 {
        i32::MIN
    }
}
