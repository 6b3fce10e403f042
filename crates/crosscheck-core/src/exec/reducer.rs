//! Policies for folding a process's output lines into a value.

/// Folds output lines, in order, into a single result.
pub trait LineReducer {
    type Output;

    fn push(&mut self, line: String);

    fn finish(self) -> Self::Output;
}

/// Keeps the first line, or an empty string when there is no output.
#[derive(Debug, Default)]
pub struct First(Option<String>);

impl LineReducer for First {
    type Output = String;

    fn push(&mut self, line: String) {
        if self.0.is_none() {
            self.0 = Some(line);
        }
    }

    fn finish(self) -> String {
        self.0.unwrap_or_default()
    }
}

/// Keeps the last line, or an empty string when there is no output.
#[derive(Debug, Default)]
pub struct Last(Option<String>);

impl LineReducer for Last {
    type Output = String;

    fn push(&mut self, line: String) {
        self.0 = Some(line);
    }

    fn finish(self) -> String {
        self.0.unwrap_or_default()
    }
}

/// Keeps every line.
#[derive(Debug, Default)]
pub struct All(Vec<String>);

impl LineReducer for All {
    type Output = Vec<String>;

    fn push(&mut self, line: String) {
        self.0.push(line);
    }

    fn finish(self) -> Vec<String> {
        self.0
    }
}

/// Ignores output; for commands run only for their side effects.
#[derive(Debug, Default)]
pub struct Discard;

impl LineReducer for Discard {
    type Output = ();

    fn push(&mut self, _line: String) {}

    fn finish(self) {}
}

pub fn first() -> First {
    First::default()
}

pub fn last() -> Last {
    Last::default()
}

pub fn all() -> All {
    All::default()
}

pub fn discard() -> Discard {
    Discard
}
