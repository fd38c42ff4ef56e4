//! Container format detection from stream magic bytes.

/// Input containers the decoder knows how to demux.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ContainerFormat {
    Mp4,
    Webm,
}

impl ContainerFormat {
    /// Demuxer name passed to the decoder's input-format flag.
    pub fn demuxer(&self) -> &'static str {
        match self {
            ContainerFormat::Mp4 => "mp4",
            ContainerFormat::Webm => "webm",
        }
    }
}

impl std::fmt::Display for ContainerFormat {
    fn fmt(&self, f: &mut std::fmt::Formatter<'_>) -> std::fmt::Result {
        f.write_str(self.demuxer())
    }
}

/// Sniff the container from the first bytes a client sends.
///
/// MP4-family files carry an `ftyp` box whose marker lands within the
/// first dozen bytes; everything else is treated as WebM. Misdetection
/// costs one garbled utterance, never the session.
pub fn sniff_container(prefix: &[u8]) -> ContainerFormat {
    let window = &prefix[..prefix.len().min(12)];
    if window.windows(4).any(|w| w == b"ftyp") {
        ContainerFormat::Mp4
    } else {
        ContainerFormat::Webm
    }
}
