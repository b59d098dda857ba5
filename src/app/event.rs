#[derive(Debug)]
pub enum AppEvent {
    /// One line typed on the console.
    Input(String),
    /// Stdin reached end of file.
    InputClosed,
}
