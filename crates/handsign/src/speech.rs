//! Spoken gesture announcements.
//!
//! Announcing is best-effort: [`Announcer::announce`] returns immediately and never reports
//! failure to the caller. Overlapping announcements are neither queued nor cancelled.

use std::{
    ffi::{OsStr, OsString},
    io,
    process::{Command, Stdio},
    thread::{self, JoinHandle},
};

/// Something that can say a phrase out loud.
pub trait Announcer {
    /// Starts announcing `phrase` without waiting for it to finish.
    fn announce(&mut self, phrase: &str);
}

impl<A: Announcer + ?Sized> Announcer for Box<A> {
    fn announce(&mut self, phrase: &str) {
        (**self).announce(phrase)
    }
}

/// An [`Announcer`] that does nothing.
#[derive(Debug, Clone, Copy, Default)]
pub struct Silent;

impl Announcer for Silent {
    fn announce(&mut self, _phrase: &str) {}
}

/// Announces phrases by running an external text-to-speech program.
///
/// Every announcement spawns a detached thread that runs the program with the phrase appended as
/// the last argument, and waits for it to exit. A program that cannot be started or exits with an
/// error is logged and otherwise ignored.
#[derive(Debug, Clone)]
pub struct SpeechCommand {
    program: OsString,
    args: Vec<OsString>,
}

impl SpeechCommand {
    /// The program used when no other is configured.
    pub const DEFAULT_PROGRAM: &'static str = "espeak-ng";

    pub fn new<S: AsRef<OsStr>>(program: S) -> Self {
        Self {
            program: program.as_ref().to_owned(),
            args: Vec::new(),
        }
    }

    /// Appends a fixed argument, passed before the phrase.
    pub fn arg<S: AsRef<OsStr>>(mut self, arg: S) -> Self {
        self.args.push(arg.as_ref().to_owned());
        self
    }

    /// Parses a whitespace-separated command line like `espeak-ng -s 150`.
    ///
    /// Returns [`None`] if `cmdline` contains no program name.
    pub fn parse(cmdline: &str) -> Option<Self> {
        let mut words = cmdline.split_whitespace();
        let program = words.next()?;
        Some(words.fold(Self::new(program), Self::arg))
    }

    pub fn program(&self) -> &OsStr {
        &self.program
    }

    pub fn args(&self) -> &[OsString] {
        &self.args
    }

    fn command(&self, phrase: &str) -> Command {
        let mut cmd = Command::new(&self.program);
        cmd.args(&self.args)
            .arg(phrase)
            .stdin(Stdio::null())
            .stdout(Stdio::null());
        cmd
    }
}

impl Default for SpeechCommand {
    fn default() -> Self {
        Self::new(Self::DEFAULT_PROGRAM)
    }
}

impl SpeechCommand {
    /// Runs the command on a new thread, which yields whether the program exited successfully.
    fn spawn(&self, phrase: &str) -> io::Result<JoinHandle<bool>> {
        let mut cmd = self.command(phrase);
        let phrase = phrase.to_string();
        thread::Builder::new()
            .name(format!("speech '{phrase}'"))
            .spawn(move || match cmd.status() {
                Ok(status) if status.success() => true,
                Ok(status) => {
                    log::warn!("speech for '{phrase}' failed: {status}");
                    false
                }
                Err(e) => {
                    log::warn!("failed to run speech command for '{phrase}': {e}");
                    false
                }
            })
    }
}

impl Announcer for SpeechCommand {
    fn announce(&mut self, phrase: &str) {
        if let Err(e) = self.spawn(phrase) {
            log::warn!("failed to spawn speech thread: {e}");
        }
    }
}

#[cfg(test)]
mod tests {
    use std::sync::{Arc, Mutex};

    use super::*;

    #[test]
    fn parse_cmdline() {
        let cmd = SpeechCommand::parse("  espeak-ng -s 150 ").unwrap();
        assert_eq!(cmd.program(), "espeak-ng");
        assert_eq!(cmd.args(), &["-s", "150"]);
        assert!(SpeechCommand::parse(" ").is_none());
    }

    #[test]
    fn phrase_is_last_argument() {
        let cmd = SpeechCommand::new("say").arg("-v").arg("Alex").command("high-five");
        let args = cmd.get_args().collect::<Vec<_>>();
        assert_eq!(args, ["-v", "Alex", "high-five"]);
    }

    #[test]
    fn missing_program_is_not_fatal() {
        let cmd = SpeechCommand::new("/nonexistent/handsign-speech");
        let handles = [cmd.spawn("fist").unwrap(), cmd.spawn("fist").unwrap()];
        for handle in handles {
            assert_eq!(handle.join().ok(), Some(false));
        }
    }

    #[test]
    fn failing_program_is_not_fatal() {
        let cmd = SpeechCommand::new("false");
        assert_eq!(cmd.spawn("fist").unwrap().join().ok(), Some(false));

        let cmd = SpeechCommand::new("true");
        assert_eq!(cmd.spawn("fist").unwrap().join().ok(), Some(true));
    }

    struct Collect(Arc<Mutex<Vec<String>>>);

    impl Announcer for Collect {
        fn announce(&mut self, phrase: &str) {
            self.0.lock().unwrap().push(phrase.to_string());
        }
    }

    #[test]
    fn boxed_announcer() {
        let said = Arc::new(Mutex::new(Vec::new()));
        let mut boxed: Box<dyn Announcer> = Box::new(Collect(said.clone()));
        boxed.announce("peace");
        Silent.announce("ignored");
        assert_eq!(*said.lock().unwrap(), ["peace"]);
    }
}
