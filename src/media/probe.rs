use serde::Deserialize;

use crate::error::{DubError, Result};
use crate::models::{MediaInfo, StreamInfo};

/// ffprobe `-print_format json -show_format -show_streams` output
#[derive(Debug, Deserialize)]
struct FfprobeOutput {
    #[serde(default)]
    streams: Vec<FfprobeStream>,
    format: Option<FfprobeFormat>,
}

#[derive(Debug, Deserialize)]
struct FfprobeStream {
    index: u32,
    codec_type: Option<String>,
    codec_name: Option<String>,
    duration: Option<String>,
}

#[derive(Debug, Deserialize)]
struct FfprobeFormat {
    duration: Option<String>,
}

/// Parse ffprobe JSON into a [`MediaInfo`].
///
/// The container duration wins; when the container has none the longest
/// stream duration is used.
pub fn parse_probe_output(json: &str) -> Result<MediaInfo> {
    let output: FfprobeOutput = serde_json::from_str(json)
        .map_err(|e| DubError::Probe(format!("Failed to parse ffprobe output: {}", e)))?;

    if output.streams.is_empty() {
        return Err(DubError::Probe("No decodable streams found".to_string()));
    }

    let container_duration = output
        .format
        .as_ref()
        .and_then(|f| f.duration.as_deref())
        .and_then(parse_seconds);

    let duration = container_duration.or_else(|| {
        output
            .streams
            .iter()
            .filter_map(|s| s.duration.as_deref().and_then(parse_seconds))
            .reduce(f64::max)
    });

    let streams = output
        .streams
        .into_iter()
        .map(|s| StreamInfo {
            index: s.index,
            codec_type: s.codec_type.unwrap_or_else(|| "unknown".to_string()),
            codec_name: s.codec_name,
        })
        .collect();

    Ok(MediaInfo { duration, streams })
}

fn parse_seconds(value: &str) -> Option<f64> {
    value.trim().parse::<f64>().ok().filter(|d| d.is_finite())
}
