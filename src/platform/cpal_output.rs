#[cfg(feature = "native")]
use cpal::{
    traits::{DeviceTrait, HostTrait, StreamTrait},
    Device, FromSample, Sample, SampleFormat, SizedSample, Stream, StreamConfig,
};
use super::AudioOutput;
use crate::graph::Renderer;
use log::{error, info};

/// Default output device via CPAL
///
/// The renderer is moved into the stream callback, so the audio thread never
/// waits on a lock held by the control thread.
#[cfg(feature = "native")]
pub struct CpalOutput {
    stream: Option<Stream>,
    device: Option<Device>,
    config: Option<StreamConfig>,
    sample_format: Option<SampleFormat>,
    sample_rate: f32,
    is_active: bool,
}

#[cfg(feature = "native")]
impl CpalOutput {
    pub fn new() -> Self {
        Self {
            stream: None,
            device: None,
            config: None,
            sample_format: None,
            sample_rate: 44100.0,
            is_active: false,
        }
    }

    /// Setup the CPAL host and device
    fn setup_host_device(&mut self) -> Result<(), anyhow::Error> {
        let host = cpal::default_host();

        let device = host
            .default_output_device()
            .ok_or_else(|| anyhow::anyhow!("Default output device is not available"))?;

        info!("Output device: {}", device.name()?);

        let supported = device.default_output_config()?;
        info!("Default output config: {:?}", supported);

        self.sample_rate = supported.sample_rate().0 as f32;
        self.sample_format = Some(supported.sample_format());
        self.config = Some(supported.into());
        self.device = Some(device);

        Ok(())
    }

    /// Create a typed stream for the given sample format
    fn make_stream<T>(
        device: &Device,
        config: &StreamConfig,
        mut renderer: Renderer,
    ) -> Result<Stream, anyhow::Error>
    where
        T: SizedSample + FromSample<f32>,
    {
        let num_channels = config.channels as usize;

        let err_fn = |err| error!("Error on output stream: {}", err);

        let stream = device.build_output_stream(
            config,
            move |output: &mut [T], _: &cpal::OutputCallbackInfo| {
                Self::process_frames(output, &mut renderer, num_channels);
            },
            err_fn,
            None,
        )?;

        Ok(stream)
    }

    /// Fill one device buffer from the renderer
    fn process_frames<SampleType>(output: &mut [SampleType], renderer: &mut Renderer, num_channels: usize)
    where
        SampleType: Sample + FromSample<f32>,
    {
        renderer.begin_block();

        for frame in output.chunks_mut(num_channels) {
            let stereo = renderer.next_frame();

            match frame.len() {
                1 => frame[0] = SampleType::from_sample(stereo.mono()),
                _ => {
                    frame[0] = SampleType::from_sample(stereo.left);
                    frame[1] = SampleType::from_sample(stereo.right);
                    // Surround channels stay silent
                    for sample in frame.iter_mut().skip(2) {
                        *sample = SampleType::EQUILIBRIUM;
                    }
                }
            }
        }
    }
}

#[cfg(feature = "native")]
impl Default for CpalOutput {
    fn default() -> Self {
        Self::new()
    }
}

#[cfg(feature = "native")]
impl AudioOutput for CpalOutput {
    fn initialize(&mut self, sample_rate: f32) -> Result<(), anyhow::Error> {
        self.sample_rate = sample_rate;
        self.setup_host_device()?;
        Ok(())
    }

    fn start(&mut self, renderer: Renderer) -> Result<(), anyhow::Error> {
        let device = self
            .device
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Device not initialized"))?;
        let config = self
            .config
            .as_ref()
            .ok_or_else(|| anyhow::anyhow!("Config not initialized"))?;
        let sample_format = self
            .sample_format
            .ok_or_else(|| anyhow::anyhow!("Sample format not initialized"))?;

        let stream = match sample_format {
            SampleFormat::I8 => Self::make_stream::<i8>(device, config, renderer)?,
            SampleFormat::I16 => Self::make_stream::<i16>(device, config, renderer)?,
            SampleFormat::I32 => Self::make_stream::<i32>(device, config, renderer)?,
            SampleFormat::I64 => Self::make_stream::<i64>(device, config, renderer)?,
            SampleFormat::U8 => Self::make_stream::<u8>(device, config, renderer)?,
            SampleFormat::U16 => Self::make_stream::<u16>(device, config, renderer)?,
            SampleFormat::U32 => Self::make_stream::<u32>(device, config, renderer)?,
            SampleFormat::U64 => Self::make_stream::<u64>(device, config, renderer)?,
            SampleFormat::F32 => Self::make_stream::<f32>(device, config, renderer)?,
            SampleFormat::F64 => Self::make_stream::<f64>(device, config, renderer)?,
            sample_format => {
                return Err(anyhow::anyhow!("Unsupported sample format '{}'", sample_format))
            }
        };

        stream.play()?;
        self.stream = Some(stream);
        self.is_active = true;
        info!("Audio stream started at sample rate: {}", self.sample_rate);

        Ok(())
    }

    fn stop(&mut self) -> Result<(), anyhow::Error> {
        if let Some(stream) = self.stream.take() {
            stream.pause()?;
            info!("Audio stream stopped");
        }
        self.is_active = false;
        self.device = None;
        self.config = None;

        Ok(())
    }

    fn sample_rate(&self) -> f32 {
        self.sample_rate
    }

    fn is_active(&self) -> bool {
        self.is_active
    }
}
