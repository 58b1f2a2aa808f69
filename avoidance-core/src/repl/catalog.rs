//! Bench command catalog expressed as a small grammar tree.
//!
//! The parser walks the same tree that `help` prints, so keywords, defaults,
//! and value bounds stay in one place.

use crate::config::THROTTLE_RAW_MAX;

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum CommandTag {
    Toggle,
    Throttle,
    Range,
    Step,
    Status,
    Help,
}

/// Keywords accepted in a [`Node::Choice`].
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ChoiceTag {
    Front,
    Left,
    Right,
    All,
    Timeout,
}

/// Integer slots accepted by the grammar.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum SlotTag {
    ThrottleRaw,
    Centimeters,
    Cycles,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct IntegerSlot {
    pub tag: SlotTag,
    pub label: &'static str,
    pub max: u16,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct ChoiceBranch {
    pub keyword: &'static str,
    pub tag: ChoiceTag,
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum Node {
    End,
    /// Required keyword, or an integer when `integer` is set.
    Choice {
        choices: &'static [ChoiceBranch],
        integer: Option<IntegerSlot>,
        next: &'static Node,
    },
    /// Integer value, optional when a default is given.
    Integer {
        slot: IntegerSlot,
        default: Option<u16>,
        next: &'static Node,
    },
    /// Optional free-form help topic.
    Topic { next: &'static Node },
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub struct CommandSpec {
    pub name: &'static str,
    pub tag: CommandTag,
    pub usage: &'static str,
    pub summary: &'static str,
    pub grammar: &'static Node,
}

/// Largest distance the bench accepts for a simulated echo.
pub const MAX_BENCH_CM: u16 = 5_000;

/// Largest number of cycles a single `step` may run.
pub const MAX_STEP_CYCLES: u16 = 1_000;

const END: Node = Node::End;

const CHANNEL_CHOICES: [ChoiceBranch; 4] = [
    ChoiceBranch {
        keyword: "front",
        tag: ChoiceTag::Front,
    },
    ChoiceBranch {
        keyword: "left",
        tag: ChoiceTag::Left,
    },
    ChoiceBranch {
        keyword: "right",
        tag: ChoiceTag::Right,
    },
    ChoiceBranch {
        keyword: "all",
        tag: ChoiceTag::All,
    },
];

const ECHO_CHOICES: [ChoiceBranch; 1] = [ChoiceBranch {
    keyword: "timeout",
    tag: ChoiceTag::Timeout,
}];

const RANGE_VALUE: Node = Node::Choice {
    choices: &ECHO_CHOICES,
    integer: Some(IntegerSlot {
        tag: SlotTag::Centimeters,
        label: "distance in cm",
        max: MAX_BENCH_CM,
    }),
    next: &END,
};

const RANGE_GRAMMAR: Node = Node::Choice {
    choices: &CHANNEL_CHOICES,
    integer: None,
    next: &RANGE_VALUE,
};

const THROTTLE_GRAMMAR: Node = Node::Integer {
    slot: IntegerSlot {
        tag: SlotTag::ThrottleRaw,
        label: "throttle sample",
        max: THROTTLE_RAW_MAX,
    },
    default: None,
    next: &END,
};

const STEP_GRAMMAR: Node = Node::Integer {
    slot: IntegerSlot {
        tag: SlotTag::Cycles,
        label: "cycle count",
        max: MAX_STEP_CYCLES,
    },
    default: Some(1),
    next: &END,
};

const HELP_GRAMMAR: Node = Node::Topic { next: &END };

const COMMANDS: [CommandSpec; 6] = [
    CommandSpec {
        name: "toggle",
        tag: CommandTag::Toggle,
        usage: "toggle",
        summary: "press and release the enable button",
        grammar: &END,
    },
    CommandSpec {
        name: "throttle",
        tag: CommandTag::Throttle,
        usage: "throttle <0-1023>",
        summary: "set the throttle potentiometer sample",
        grammar: &THROTTLE_GRAMMAR,
    },
    CommandSpec {
        name: "range",
        tag: CommandTag::Range,
        usage: "range <front|left|right|all> <cm|timeout>",
        summary: "place an echo at a distance or make a channel time out",
        grammar: &RANGE_GRAMMAR,
    },
    CommandSpec {
        name: "step",
        tag: CommandTag::Step,
        usage: "step [cycles]",
        summary: "advance the control loop by whole cycles",
        grammar: &STEP_GRAMMAR,
    },
    CommandSpec {
        name: "status",
        tag: CommandTag::Status,
        usage: "status",
        summary: "show supervisor, readings, and motor state",
        grammar: &END,
    },
    CommandSpec {
        name: "help",
        tag: CommandTag::Help,
        usage: "help [command]",
        summary: "list commands or describe one",
        grammar: &HELP_GRAMMAR,
    },
];

/// Returns the full command catalog.
#[must_use]
pub const fn commands() -> &'static [CommandSpec] {
    &COMMANDS
}

/// Finds a command by name (case insensitive).
#[must_use]
pub fn find(name: &str) -> Option<&'static CommandSpec> {
    COMMANDS
        .iter()
        .find(|command| command.name.eq_ignore_ascii_case(name))
}
