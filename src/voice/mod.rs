//! Client-side audio
//!
//! Handles microphone capture, WAV encoding and reply playback. The device
//! layer (`cpal`) is only built with the `audio` feature; everything the
//! session controller needs is expressed through [`Microphone`] and
//! [`Speaker`] so it runs without audio hardware.

#[cfg(feature = "audio")]
mod capture;
#[cfg(feature = "audio")]
mod playback;
mod wav;

#[cfg(feature = "audio")]
pub use capture::AudioCapture;
#[cfg(feature = "audio")]
pub use playback::AudioPlayback;
pub use wav::{decode_wav, resample, samples_to_wav};

use crate::Result;

/// Sample rate for audio capture (16kHz for speech)
pub const SAMPLE_RATE: u32 = 16000;

/// A capture source that buffers samples between `start` and `stop`
pub trait Microphone {
    /// Acquire the device and begin buffering
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be opened
    fn start(&mut self) -> Result<()>;

    /// Release the device; calling it when already stopped is a no-op
    fn stop(&mut self);

    /// Drain buffered samples
    fn take_samples(&mut self) -> Vec<f32>;

    /// Sample rate of buffered samples
    fn sample_rate(&self) -> u32;
}

/// Plays an encoded reply clip
pub trait Speaker {
    /// Decode and play `audio`, returning when playback finishes
    ///
    /// # Errors
    ///
    /// Returns error if the clip cannot be decoded or played
    fn play(&mut self, audio: &[u8]) -> Result<()>;
}

/// Play `audio` on `speaker` from async code
///
/// On a multi-threaded runtime the worker hands its other tasks off for the
/// duration of playback.
///
/// # Errors
///
/// Returns whatever the speaker reports
pub fn play_blocking<S: Speaker + ?Sized>(speaker: &mut S, audio: &[u8]) -> Result<()> {
    use tokio::runtime::{Handle, RuntimeFlavor};

    match Handle::try_current() {
        Ok(handle) if handle.runtime_flavor() == RuntimeFlavor::MultiThread => {
            tokio::task::block_in_place(|| speaker.play(audio))
        }
        _ => speaker.play(audio),
    }
}

/// A [`Speaker`] that discards audio (text-only sessions)
#[derive(Debug, Default, Clone, Copy)]
pub struct Mute;

impl Speaker for Mute {
    fn play(&mut self, _audio: &[u8]) -> Result<()> {
        Ok(())
    }
}

/// Keeps a microphone open for as long as the guard lives
///
/// The device is released on every exit path: [`CaptureGuard::finish`],
/// early return, `?` propagation or a dropped future.
pub struct CaptureGuard<'a, M: Microphone + ?Sized> {
    mic: &'a mut M,
}

impl<'a, M: Microphone + ?Sized> CaptureGuard<'a, M> {
    /// Start `mic` and guard it
    ///
    /// # Errors
    ///
    /// Returns error if the device cannot be started
    pub fn start(mic: &'a mut M) -> Result<Self> {
        mic.start()?;
        Ok(Self { mic })
    }

    /// Stop capturing and return everything recorded
    pub fn finish(self) -> Vec<f32> {
        self.mic.stop();
        self.mic.take_samples()
    }
}

impl<M: Microphone + ?Sized> Drop for CaptureGuard<'_, M> {
    fn drop(&mut self) {
        self.mic.stop();
    }
}
