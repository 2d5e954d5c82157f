//! Local file frame source using FFmpeg.
//!
//! Decodes the best video stream of a local file into RGB24 frames, in order.
//! At end of file the decoder is flushed so trailing frames are delivered before
//! end of stream is reported.

use anyhow::Result;
use ffmpeg_next as ffmpeg;

use super::file::{FileConfig, FileStats};
use crate::error::PipelineError;
use crate::frame::Frame;

pub(crate) struct FfmpegFileSource {
    config: FileConfig,
    input: ffmpeg::format::context::Input,
    stream_index: usize,
    decoder: ffmpeg::codec::decoder::Video,
    scaler: ffmpeg::software::scaling::Context,
    frame_count: u64,
    eof_sent: bool,
}

impl FfmpegFileSource {
    pub(crate) fn new(config: FileConfig) -> Result<Self> {
        ffmpeg::init().map_err(|e| decode_error("initialize ffmpeg", e))?;
        let input = ffmpeg::format::input(&config.path)
            .map_err(|e| decode_error(&format!("open '{}'", config.path), e))?;
        let input_stream = input
            .streams()
            .best(ffmpeg::media::Type::Video)
            .ok_or_else(|| PipelineError::decode(format!("'{}' has no video track", config.path)))?;
        let stream_index = input_stream.index();
        let context = ffmpeg::codec::context::Context::from_parameters(input_stream.parameters())
            .map_err(|e| decode_error("load video decoder parameters", e))?;
        let decoder = context
            .decoder()
            .video()
            .map_err(|e| decode_error("open ffmpeg video decoder", e))?;

        let scaler = ffmpeg::software::scaling::context::Context::get(
            decoder.format(),
            decoder.width(),
            decoder.height(),
            ffmpeg::util::format::pixel::Pixel::RGB24,
            decoder.width(),
            decoder.height(),
            ffmpeg::software::scaling::flag::Flags::BILINEAR,
        )
        .map_err(|e| decode_error("create ffmpeg scaler", e))?;

        log::info!(
            "FileSource: opened {} (ffmpeg, {}x{})",
            config.path,
            decoder.width(),
            decoder.height()
        );

        Ok(Self {
            config,
            input,
            stream_index,
            decoder,
            scaler,
            frame_count: 0,
            eof_sent: false,
        })
    }

    pub(crate) fn next_frame(&mut self) -> Result<Option<Frame>> {
        let mut decoded = ffmpeg::frame::Video::empty();

        loop {
            match receive_step(self.decoder.receive_frame(&mut decoded))? {
                DecoderStep::Frame => return self.convert(&decoded).map(Some),
                DecoderStep::Drained => return Ok(None),
                DecoderStep::NeedsInput if self.eof_sent => {
                    return Err(PipelineError::decode(
                        "ffmpeg decoder asked for input after end of file",
                    )
                    .into());
                }
                DecoderStep::NeedsInput => {}
            }

            match self.next_video_packet()? {
                Some(packet) => self
                    .decoder
                    .send_packet(&packet)
                    .map_err(|e| decode_error("send packet to ffmpeg decoder", e))?,
                None => {
                    self.decoder
                        .send_eof()
                        .map_err(|e| decode_error("flush ffmpeg decoder", e))?;
                    self.eof_sent = true;
                }
            }
        }
    }

    pub(crate) fn stats(&self) -> FileStats {
        FileStats {
            frames_decoded: self.frame_count,
            path: self.config.path.clone(),
        }
    }

    /// Next packet of the video stream, or `None` at end of file.
    fn next_video_packet(&mut self) -> Result<Option<ffmpeg::Packet>> {
        loop {
            let mut packet = ffmpeg::Packet::empty();
            if !read_step(packet.read(&mut self.input))? {
                return Ok(None);
            }
            if packet.stream() == self.stream_index {
                return Ok(Some(packet));
            }
        }
    }

    fn convert(&mut self, decoded: &ffmpeg::frame::Video) -> Result<Frame> {
        let mut rgb_frame = ffmpeg::frame::Video::empty();
        self.scaler
            .run(decoded, &mut rgb_frame)
            .map_err(|e| decode_error("scale frame to RGB", e))?;
        let (pixels, width, height) = frame_to_pixels(&rgb_frame)?;
        self.frame_count += 1;
        Frame::from_rgb(pixels, width, height)
    }
}

#[derive(Clone, Copy, Debug, PartialEq, Eq)]
enum DecoderStep {
    Frame,
    NeedsInput,
    Drained,
}

/// Map a `receive_frame` result. Only EAGAIN and EOF are expected states.
fn receive_step(result: std::result::Result<(), ffmpeg::Error>) -> Result<DecoderStep> {
    match result {
        Ok(()) => Ok(DecoderStep::Frame),
        Err(ffmpeg::Error::Other {
            errno: ffmpeg::error::EAGAIN,
        }) => Ok(DecoderStep::NeedsInput),
        Err(ffmpeg::Error::Eof) => Ok(DecoderStep::Drained),
        Err(e) => Err(decode_error("decode video frame", e).into()),
    }
}

/// Map a packet read result: `true` when a packet was read, `false` at end of file.
fn read_step(result: std::result::Result<(), ffmpeg::Error>) -> Result<bool> {
    match result {
        Ok(()) => Ok(true),
        Err(ffmpeg::Error::Eof) => Ok(false),
        Err(e) => Err(decode_error("read packet", e).into()),
    }
}

fn decode_error(action: &str, err: ffmpeg::Error) -> PipelineError {
    PipelineError::decode(format!("{}: {}", action, err))
}

fn frame_to_pixels(frame: &ffmpeg::frame::Video) -> Result<(Vec<u8>, u32, u32)> {
    let width = frame.width();
    let height = frame.height();
    let row_bytes = (width as usize) * 3;
    let stride = frame.stride(0);
    let data = frame.data(0);

    if stride == row_bytes {
        let packed = data
            .get(..row_bytes * height as usize)
            .ok_or_else(|| PipelineError::decode("ffmpeg frame is shorter than its size"))?;
        return Ok((packed.to_vec(), width, height));
    }

    let mut pixels = Vec::with_capacity(row_bytes * height as usize);
    for row in 0..height as usize {
        let start = row * stride;
        let end = start + row_bytes;
        pixels.extend_from_slice(
            data.get(start..end)
                .ok_or_else(|| PipelineError::decode("ffmpeg frame row is out of bounds"))?,
        );
    }

    Ok((pixels, width, height))
}
