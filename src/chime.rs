//! Completion alert playback.

use std::io::{self, ErrorKind, Write};
use std::path::{Path, PathBuf};
use std::process::{Child, Command, Stdio};
use std::sync::atomic::{AtomicUsize, Ordering};
use std::sync::Arc;

use crate::error::ChimeError;

/// An audible alert with an explicit release. Implementations must tolerate
/// `release` being called at any time, including when nothing is playing.
pub trait Chime: Send {
    fn play(&mut self) -> Result<(), ChimeError>;

    /// Release the playback resource if it has completed on its own
    fn reap(&mut self) {}

    /// Block until playback completes, then release
    fn finish(&mut self) {}

    /// Stop playback if needed and release. Never fails.
    fn release(&mut self) {}
}

const PLAYERS: [&str; 3] = ["paplay", "aplay", "afplay"];

const SYSTEM_SOUNDS: [&str; 4] = [
    "/usr/share/sounds/freedesktop/stereo/complete.oga",
    "/usr/share/sounds/sound-icons/guitar-11.wav",
    "/usr/share/sounds/generic.wav",
    "/System/Library/Sounds/Glass.aiff",
];

fn candidate_sounds(sound_file: Option<&Path>) -> Vec<&Path> {
    match sound_file {
        Some(p) => vec![p],
        None => SYSTEM_SOUNDS.iter().map(Path::new).collect(),
    }
}

fn on_path(program: &str) -> bool {
    std::env::var_os("PATH")
        .map(|paths| std::env::split_paths(&paths).any(|dir| dir.join(program).is_file()))
        .unwrap_or(false)
}

/// Whether `CommandChime` has a sound file and a player to play it with.
/// When not, the terminal bell is all that is left.
pub fn sound_player_available(sound_file: Option<&Path>) -> bool {
    candidate_sounds(sound_file).iter().any(|f| f.exists()) && PLAYERS.iter().any(|p| on_path(p))
}

/// Plays a sound file through the first system player that starts, falling
/// back to the terminal bell.
#[derive(Debug, Default)]
pub struct CommandChime {
    sound_file: Option<PathBuf>,
    child: Option<Child>,
}

impl CommandChime {
    pub fn new(sound_file: Option<PathBuf>) -> Self {
        Self {
            sound_file,
            child: None,
        }
    }

    fn sound_files(&self) -> Vec<&Path> {
        candidate_sounds(self.sound_file.as_deref())
    }

    fn spawn_player(&self) -> Option<Child> {
        for file in self.sound_files().into_iter().filter(|f| f.exists()) {
            for player in PLAYERS {
                match Command::new(player)
                    .arg(file)
                    .stdin(Stdio::null())
                    .stdout(Stdio::null())
                    .stderr(Stdio::null())
                    .spawn()
                {
                    Ok(child) => {
                        tracing::debug!(player, file = %file.display(), "playing completion alert");
                        return Some(child);
                    }
                    Err(e) if e.kind() == ErrorKind::NotFound => continue,
                    Err(e) => {
                        tracing::warn!(player, error = %e, "sound player failed to start");
                    }
                }
            }
        }
        None
    }
}

impl Chime for CommandChime {
    fn play(&mut self) -> Result<(), ChimeError> {
        self.release();
        match self.spawn_player() {
            Some(child) => {
                self.child = Some(child);
                Ok(())
            }
            None => {
                tracing::warn!("no sound player or sound file found, ringing the terminal bell");
                TerminalBell.play()
            }
        }
    }

    fn reap(&mut self) {
        if let Some(child) = self.child.as_mut() {
            match child.try_wait() {
                Ok(None) => {}
                Ok(Some(status)) => {
                    tracing::debug!(%status, "completion alert finished");
                    self.child = None;
                }
                Err(e) => {
                    tracing::warn!(error = %e, "lost track of completion alert");
                    self.child = None;
                }
            }
        }
    }

    fn finish(&mut self) {
        if let Some(mut child) = self.child.take() {
            if let Err(e) = child.wait() {
                tracing::warn!(error = %e, "waiting for completion alert failed");
            }
        }
    }

    fn release(&mut self) {
        let Some(mut child) = self.child.take() else {
            return;
        };
        match child.try_wait() {
            Ok(Some(_)) => {}
            Ok(None) => {
                if let Err(e) = child.kill() {
                    tracing::warn!(error = %e, "failed to stop completion alert");
                }
                if let Err(e) = child.wait() {
                    tracing::warn!(error = %e, "failed to reap completion alert");
                }
            }
            Err(e) => tracing::warn!(error = %e, "failed to query completion alert"),
        }
    }
}

impl Drop for CommandChime {
    fn drop(&mut self) {
        self.release();
    }
}

/// Rings the terminal bell (BEL)
#[derive(Debug, Default, Clone, Copy)]
pub struct TerminalBell;

impl Chime for TerminalBell {
    fn play(&mut self) -> Result<(), ChimeError> {
        let mut out = io::stdout();
        out.write_all(b"\x07")?;
        out.flush()?;
        Ok(())
    }
}

#[derive(Debug, Default, Clone, Copy)]
pub struct SilentChime;

impl Chime for SilentChime {
    fn play(&mut self) -> Result<(), ChimeError> {
        Ok(())
    }
}

/// Counts plays and releases; clones share the counters
#[derive(Debug, Default, Clone)]
pub struct RecordingChime {
    plays: Arc<AtomicUsize>,
    releases: Arc<AtomicUsize>,
}

impl RecordingChime {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn plays(&self) -> usize {
        self.plays.load(Ordering::SeqCst)
    }

    pub fn releases(&self) -> usize {
        self.releases.load(Ordering::SeqCst)
    }
}

impl Chime for RecordingChime {
    fn play(&mut self) -> Result<(), ChimeError> {
        self.plays.fetch_add(1, Ordering::SeqCst);
        Ok(())
    }

    fn release(&mut self) {
        self.releases.fetch_add(1, Ordering::SeqCst);
    }
}

/// Pick the alert for the current settings
pub fn for_settings(sound: bool, sound_file: Option<PathBuf>) -> Box<dyn Chime> {
    if sound {
        Box::new(CommandChime::new(sound_file))
    } else {
        Box::new(SilentChime)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn release_without_playback_is_harmless() {
        let mut chime = CommandChime::new(None);
        chime.release();
        chime.reap();
        chime.finish();
        assert!(chime.child.is_none());
    }

    #[test]
    fn missing_sound_file_spawns_nothing() {
        let chime = CommandChime::new(Some(PathBuf::from("/definitely/not/here.wav")));
        assert!(chime.spawn_player().is_none());
    }

    #[test]
    fn recording_chime_clones_share_counts() {
        let chime = RecordingChime::new();
        let mut handle = chime.clone();
        handle.play().unwrap();
        handle.release();
        assert_eq!(chime.plays(), 1);
        assert_eq!(chime.releases(), 1);
    }

    #[test]
    fn silent_chime_for_disabled_sound() {
        let mut chime = for_settings(false, None);
        assert!(chime.play().is_ok());
    }

    #[test]
    fn missing_sound_file_has_no_player() {
        assert!(!sound_player_available(Some(Path::new("/definitely/not/here.wav"))));
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn release_stops_a_playing_alert() {
        let mut chime = CommandChime::new(None);
        chime.child = Some(Command::new("sleep").arg("30").spawn().unwrap());
        let pid = chime.child.as_ref().unwrap().id();

        chime.reap();
        assert!(chime.child.is_some(), "still playing");

        chime.release();
        assert!(chime.child.is_none());
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
    }

    #[cfg(target_os = "linux")]
    #[test]
    fn dropping_the_chime_stops_playback() {
        let mut chime = CommandChime::new(None);
        chime.child = Some(Command::new("sleep").arg("30").spawn().unwrap());
        let pid = chime.child.as_ref().unwrap().id();

        drop(chime);
        assert!(!Path::new(&format!("/proc/{pid}")).exists());
    }
}
