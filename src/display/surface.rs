//! Drawing commands issued to the host GUI.

use crate::calibration::BoxSize;

/// A drawing command for the host to carry out.
///
/// Coordinates are CSS pixels relative to the element they belong to.
#[derive(Debug, Clone, PartialEq)]
pub enum DisplayCommand {
    /// Show participant instructions.
    ShowInstructions(String),
    /// Remove the instructions.
    HideInstructions,
    /// Draw the resizable box.
    DrawBox(BoxSize),
    /// Change the size of the resizable box.
    ResizeBox(BoxSize),
    /// Place the blind spot ball and fixation square (left edges).
    PlaceBlindspotMarkers { ball_left: f64, square_left: f64 },
    /// Move the blind spot ball.
    MoveBall { left: f64 },
    /// Update the remaining-measurements counter.
    ShowRemaining(u32),
    /// Resize the experiment canvas.
    ResizeCanvas { width: f64, height: f64 },
}

/// Host-side renderer for [`DisplayCommand`]s.
pub trait DisplaySurface {
    fn apply(&mut self, command: DisplayCommand);
}

impl<T: DisplaySurface + ?Sized> DisplaySurface for &mut T {
    fn apply(&mut self, command: DisplayCommand) {
        (**self).apply(command)
    }
}

/// Surface that discards every command.
#[derive(Debug, Clone, Copy, Default)]
pub struct NullDisplay;

impl DisplaySurface for NullDisplay {
    fn apply(&mut self, _command: DisplayCommand) {}
}

/// Surface that records commands in order.
#[derive(Debug, Clone, Default)]
pub struct CommandLog {
    commands: Vec<DisplayCommand>,
}

impl CommandLog {
    pub fn commands(&self) -> &[DisplayCommand] {
        &self.commands
    }

    pub fn last(&self) -> Option<&DisplayCommand> {
        self.commands.last()
    }

    /// Take all recorded commands, leaving the log empty.
    pub fn drain(&mut self) -> Vec<DisplayCommand> {
        std::mem::take(&mut self.commands)
    }

    pub fn len(&self) -> usize {
        self.commands.len()
    }

    pub fn is_empty(&self) -> bool {
        self.commands.is_empty()
    }
}

impl DisplaySurface for CommandLog {
    fn apply(&mut self, command: DisplayCommand) {
        self.commands.push(command);
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_command_log() {
        let mut log = CommandLog::default();
        log.apply(DisplayCommand::HideInstructions);
        log.apply(DisplayCommand::MoveBall { left: 10.0 });
        assert_eq!(log.len(), 2);
        assert_eq!(log.last(), Some(&DisplayCommand::MoveBall { left: 10.0 }));

        let drained = log.drain();
        assert_eq!(drained.len(), 2);
        assert!(log.is_empty());
    }

    #[test]
    fn test_mut_ref_forwards() {
        fn draw<D: DisplaySurface>(mut surface: D) {
            surface.apply(DisplayCommand::ShowRemaining(3));
        }

        let mut log = CommandLog::default();
        draw(&mut log);
        assert_eq!(log.commands(), &[DisplayCommand::ShowRemaining(3)]);
    }
}
