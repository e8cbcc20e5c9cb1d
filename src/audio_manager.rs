//! Software mixer. The game thread posts commands through a [`MixerHandle`]; the audio
//! thread owns the [`Mixer`] and drains those commands at the start of every buffer, so
//! nothing is locked while samples are being mixed.
use std::sync::atomic::{AtomicU64, Ordering};
use std::sync::Arc;

use crossbeam_channel::{bounded, Receiver, Sender, TrySendError};
use tracing::warn;

pub const SAMPLE_RATE: u32 = 44_100;
/// Commands that may be in flight between two mix callbacks.
const COMMAND_CAPACITY: usize = 64;
/// Slot value meaning "no voice".
const FREE: u64 = 0;
/// Finished sounds waiting for the game thread to drop them.
const RETIRED_CAPACITY: usize = 256;

/// Shared mono samples in `[-1, 1]`.
#[derive(Clone, Debug)]
pub struct Sound {
    samples: Arc<[f32]>,
}

impl Sound {
    pub fn from_samples(samples: Vec<f32>) -> Self {
        Self {
            samples: samples.into(),
        }
    }

    /// Sine blip with a linear fade-out, for when no sound file is available.
    pub fn tone(frequency: f32, seconds: f32, amplitude: f32) -> Self {
        let count = (seconds.max(0.0) * SAMPLE_RATE as f32) as usize;
        let samples = (0..count)
            .map(|i| {
                let t = i as f32 / SAMPLE_RATE as f32;
                let fade = 1.0 - i as f32 / count as f32;
                (t * frequency * std::f32::consts::TAU).sin() * amplitude * fade
            })
            .collect();
        Self::from_samples(samples)
    }

    /// Decodes any format rodio understands into mono samples at [`SAMPLE_RATE`].
    #[cfg(feature = "desktop")]
    pub fn decode(bytes: Vec<u8>) -> anyhow::Result<Self> {
        use rodio::source::UniformSourceIterator;

        let decoder = rodio::Decoder::new(std::io::Cursor::new(bytes))?;
        let mono: UniformSourceIterator<_, f32> =
            UniformSourceIterator::new(decoder, 1, SAMPLE_RATE);
        Ok(Self::from_samples(mono.collect()))
    }

    pub fn sample_count(&self) -> usize {
        self.samples.len()
    }

    /// Same underlying sample data.
    pub fn same_as(&self, other: &Sound) -> bool {
        Arc::ptr_eq(&self.samples, &other.samples)
    }
}

/// Ticket for one started sound.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub struct Voice(u64);

#[derive(Debug)]
enum MixerCommand {
    Start {
        voice: Voice,
        sound: Sound,
        left_gain: f32,
        right_gain: f32,
        looping: bool,
        playing: bool,
    },
    Resume(Voice),
    Pause(Voice),
    Stop(Voice),
    StopSound(Sound),
    SetGain(f32),
}

#[derive(Debug)]
struct Channel {
    voice: Voice,
    sound: Sound,
    position: usize,
    left_gain: f32,
    right_gain: f32,
    looping: bool,
    playing: bool,
}

/// Audio-thread half: the channel pool.
pub struct Mixer {
    channels: Vec<Option<Channel>>,
    gain: f32,
    commands: Receiver<MixerCommand>,
    retired: Sender<Sound>,
    slots: Arc<[AtomicU64]>,
}

/// Game-thread half.
#[derive(Clone)]
pub struct MixerHandle {
    commands: Sender<MixerCommand>,
    retired: Receiver<Sound>,
    next_voice: Arc<AtomicU64>,
    slots: Arc<[AtomicU64]>,
}

/// Creates a pool of `channel_count` channels with master `gain`.
pub fn mixer(channel_count: usize, gain: f32) -> (MixerHandle, Mixer) {
    let (tx, rx) = bounded(COMMAND_CAPACITY);
    let (retired_tx, retired_rx) = bounded(RETIRED_CAPACITY);
    let slots: Arc<[AtomicU64]> = (0..channel_count).map(|_| AtomicU64::new(FREE)).collect();
    let handle = MixerHandle {
        commands: tx,
        retired: retired_rx,
        next_voice: Arc::new(AtomicU64::new(FREE + 1)),
        slots: slots.clone(),
    };
    let mixer = Mixer {
        channels: (0..channel_count).map(|_| None).collect(),
        gain,
        commands: rx,
        retired: retired_tx,
        slots,
    };
    (handle, mixer)
}

impl MixerHandle {
    /// Starts `sound` right away.
    pub fn play(&self, sound: &Sound, left_gain: f32, right_gain: f32, looping: bool) -> Voice {
        self.start(sound, left_gain, right_gain, looping, true)
    }

    /// Reserves a channel for `sound` in the paused state; see [`MixerHandle::resume`].
    pub fn queue(&self, sound: &Sound, left_gain: f32, right_gain: f32, looping: bool) -> Voice {
        self.start(sound, left_gain, right_gain, looping, false)
    }

    fn start(&self, sound: &Sound, left_gain: f32, right_gain: f32, looping: bool, playing: bool) -> Voice {
        let voice = Voice(self.next_voice.fetch_add(1, Ordering::Relaxed));
        self.post(MixerCommand::Start {
            voice,
            sound: sound.clone(),
            left_gain,
            right_gain,
            looping,
            playing,
        });
        voice
    }

    pub fn resume(&self, voice: Voice) {
        self.post(MixerCommand::Resume(voice));
    }

    pub fn pause(&self, voice: Voice) {
        self.post(MixerCommand::Pause(voice));
    }

    pub fn stop(&self, voice: Voice) {
        self.post(MixerCommand::Stop(voice));
    }

    /// Stops every channel playing `sound`.
    pub fn stop_sound(&self, sound: &Sound) {
        self.post(MixerCommand::StopSound(sound.clone()));
    }

    pub fn set_gain(&self, gain: f32) {
        self.post(MixerCommand::SetGain(gain));
    }

    /// Whether `voice` holds a channel, as of the last mix. A voice started since then
    /// reports `false` until the audio thread has picked it up.
    pub fn is_playing(&self, voice: Voice) -> bool {
        self.slots
            .iter()
            .any(|s| s.load(Ordering::Acquire) == voice.0)
    }

    /// Drops the sounds the mixer is done with, so their samples are never freed on the
    /// audio thread. Call once per frame. Returns how many were released.
    pub fn reclaim(&self) -> usize {
        self.retired.try_iter().count()
    }

    fn post(&self, command: MixerCommand) {
        match self.commands.try_send(command) {
            Ok(()) => {}
            Err(TrySendError::Full(command)) => warn!(?command, "mixer queue full, dropping"),
            Err(TrySendError::Disconnected(_)) => {}
        }
    }
}

impl Mixer {
    pub fn channel_count(&self) -> usize {
        self.channels.len()
    }

    pub fn gain(&self) -> f32 {
        self.gain
    }

    fn apply(&mut self, command: MixerCommand) {
        match command {
            MixerCommand::Start {
                voice,
                sound,
                left_gain,
                right_gain,
                looping,
                playing,
            } => match self.channels.iter().position(Option::is_none) {
                Some(i) => {
                    self.channels[i] = Some(Channel {
                        voice,
                        sound,
                        position: 0,
                        left_gain,
                        right_gain,
                        looping,
                        playing,
                    });
                    self.slots[i].store(voice.0, Ordering::Release);
                }
                None => {
                    warn!(?voice, "no free mixer channel");
                    self.retire(sound);
                }
            },
            MixerCommand::Resume(voice) => {
                if let Some(ch) = self.find(voice) {
                    ch.playing = true;
                }
            }
            MixerCommand::Pause(voice) => {
                if let Some(ch) = self.find(voice) {
                    ch.playing = false;
                }
            }
            MixerCommand::Stop(voice) => {
                for i in 0..self.channels.len() {
                    if self.channels[i].as_ref().is_some_and(|c| c.voice == voice) {
                        self.free(i);
                    }
                }
            }
            MixerCommand::StopSound(sound) => {
                for i in 0..self.channels.len() {
                    if self.channels[i].as_ref().is_some_and(|c| c.sound.same_as(&sound)) {
                        self.free(i);
                    }
                }
                self.retire(sound);
            }
            MixerCommand::SetGain(gain) => self.gain = gain,
        }
    }

    fn find(&mut self, voice: Voice) -> Option<&mut Channel> {
        self.channels
            .iter_mut()
            .flatten()
            .find(|c| c.voice == voice)
    }

    fn free(&mut self, i: usize) {
        if let Some(ch) = self.channels[i].take() {
            self.retire(ch.sound);
        }
        self.slots[i].store(FREE, Ordering::Release);
    }

    /// Hands `sound` back to the game thread. If nobody has been reclaiming and the queue
    /// is full, the sound is dropped here instead.
    fn retire(&self, sound: Sound) {
        if let Err(e) = self.retired.try_send(sound) {
            drop(e.into_inner());
        }
    }

    /// Fills an interleaved stereo buffer. Pending commands are applied first.
    pub fn mix(&mut self, out: &mut [f32]) {
        while let Ok(command) = self.commands.try_recv() {
            self.apply(command);
        }

        out.fill(0.0);
        let frames = out.len() / 2;
        for i in 0..self.channels.len() {
            let Some(ch) = self.channels[i].as_mut() else {
                continue;
            };
            if !ch.playing {
                continue;
            }
            let samples = &ch.sound.samples;
            let left = ch.left_gain * self.gain;
            let right = ch.right_gain * self.gain;
            let mut frame = 0;
            while frame < frames {
                if ch.position >= samples.len() {
                    if ch.looping && !samples.is_empty() {
                        ch.position = 0;
                    } else {
                        break;
                    }
                }
                let s = samples[ch.position];
                out[frame * 2] += s * left;
                out[frame * 2 + 1] += s * right;
                ch.position += 1;
                frame += 1;
            }
            if ch.position >= samples.len() && !(ch.looping && !samples.is_empty()) {
                self.free(i);
            }
        }
    }
}

/// Endless rodio source pulling stereo frames from the mixer.
#[cfg(feature = "desktop")]
pub struct MixerSource {
    mixer: Mixer,
    buffer: Vec<f32>,
    cursor: usize,
}

#[cfg(feature = "desktop")]
impl MixerSource {
    /// `frames` per mix call; smaller means lower latency and more callbacks.
    pub fn new(mixer: Mixer, frames: usize) -> Self {
        let buffer = vec![0.0; frames.max(1) * 2];
        let cursor = buffer.len();
        Self {
            mixer,
            buffer,
            cursor,
        }
    }
}

#[cfg(feature = "desktop")]
impl Iterator for MixerSource {
    type Item = f32;

    fn next(&mut self) -> Option<f32> {
        if self.cursor >= self.buffer.len() {
            self.mixer.mix(&mut self.buffer);
            self.cursor = 0;
        }
        let s = self.buffer[self.cursor];
        self.cursor += 1;
        Some(s)
    }
}

#[cfg(feature = "desktop")]
impl rodio::Source for MixerSource {
    fn current_frame_len(&self) -> Option<usize> {
        Some(self.buffer.len() - self.cursor.min(self.buffer.len())).filter(|n| *n > 0)
    }

    fn channels(&self) -> u16 {
        2
    }

    fn sample_rate(&self) -> u32 {
        SAMPLE_RATE
    }

    fn total_duration(&self) -> Option<std::time::Duration> {
        None
    }
}

/// Keeps the output device open and the mixer playing on it.
#[cfg(feature = "desktop")]
pub struct AudioManager {
    _stream: rodio::OutputStream,
    handle: MixerHandle,
}

#[cfg(feature = "desktop")]
impl AudioManager {
    pub fn new(channel_count: usize, gain: f32) -> anyhow::Result<Self> {
        let (stream, output) = rodio::OutputStream::try_default()?;
        let (handle, mixer) = mixer(channel_count, gain);
        output.play_raw(MixerSource::new(mixer, 512))?;
        Ok(Self {
            _stream: stream,
            handle,
        })
    }

    pub fn handle(&self) -> &MixerHandle {
        &self.handle
    }
}
