/// One line typed at the prompt.
#[derive(Debug, Clone, PartialEq, Eq)]
pub enum Command {
    /// Activate row N: enter a folder or play a track.
    Select(usize),
    /// Play row N even if it is a folder.
    Play(usize),
    Back,
    Refresh,
    List,
    Help,
    Quit,
}

pub const HELP: &str = "Commands: N=open/play row N, p N=play row N, b=back, r=refresh, l=list, h=help, q=quit";

pub fn parse(line: &str) -> Result<Command, String> {
    let mut words = line.split_whitespace();
    let Some(head) = words.next() else {
        return Ok(Command::List);
    };
    let arg = words.next();

    if words.next().is_some() {
        return Err(format!("Too many arguments in '{}'", line.trim()));
    }

    match (head, arg) {
        ("b" | "back" | "..", None) => Ok(Command::Back),
        ("r" | "refresh", None) => Ok(Command::Refresh),
        ("l" | "ls" | "list", None) => Ok(Command::List),
        ("h" | "help" | "?", None) => Ok(Command::Help),
        ("q" | "quit" | "exit", None) => Ok(Command::Quit),
        ("p" | "play", Some(n)) => row(n).map(Command::Play),
        ("cd" | "open", Some(n)) => row(n).map(Command::Select),
        (n, None) => row(n).map(Command::Select),
        _ => Err(format!("Unknown command '{}'", line.trim())),
    }
}

fn row(raw: &str) -> Result<usize, String> {
    raw.parse::<usize>()
        .map_err(|_| format!("'{}' is not a row number", raw))
}
