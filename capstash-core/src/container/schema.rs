//! The slice of the Matroska/WebM element table that capture output uses.

pub mod ids {
    pub const EBML: u32 = 0x1A45_DFA3;
    pub const EBML_VERSION: u32 = 0x4286;
    pub const EBML_READ_VERSION: u32 = 0x42F7;
    pub const EBML_MAX_ID_LENGTH: u32 = 0x42F2;
    pub const EBML_MAX_SIZE_LENGTH: u32 = 0x42F3;
    pub const DOC_TYPE: u32 = 0x4282;
    pub const DOC_TYPE_VERSION: u32 = 0x4287;
    pub const DOC_TYPE_READ_VERSION: u32 = 0x4285;

    pub const VOID: u32 = 0xEC;
    pub const CRC32: u32 = 0xBF;

    pub const SEGMENT: u32 = 0x1853_8067;

    pub const SEEK_HEAD: u32 = 0x114D_9B74;
    pub const SEEK: u32 = 0x4DBB;
    pub const SEEK_ID: u32 = 0x53AB;
    pub const SEEK_POSITION: u32 = 0x53AC;

    pub const INFO: u32 = 0x1549_A966;
    pub const TIMECODE_SCALE: u32 = 0x2A_D7B1;
    pub const DURATION: u32 = 0x4489;
    pub const DATE_UTC: u32 = 0x4461;
    pub const TITLE: u32 = 0x7BA9;
    pub const MUXING_APP: u32 = 0x4D80;
    pub const WRITING_APP: u32 = 0x5741;
    pub const SEGMENT_UID: u32 = 0x73A4;

    pub const TRACKS: u32 = 0x1654_AE6B;
    pub const TRACK_ENTRY: u32 = 0xAE;
    pub const TRACK_NUMBER: u32 = 0xD7;
    pub const TRACK_UID: u32 = 0x73C5;
    pub const TRACK_TYPE: u32 = 0x83;
    pub const FLAG_LACING: u32 = 0x9C;
    pub const DEFAULT_DURATION: u32 = 0x23E383;
    pub const NAME: u32 = 0x536E;
    pub const LANGUAGE: u32 = 0x22B59C;
    pub const CODEC_ID: u32 = 0x86;
    pub const CODEC_PRIVATE: u32 = 0x63A2;
    pub const CODEC_NAME: u32 = 0x258688;
    pub const VIDEO: u32 = 0xE0;
    pub const PIXEL_WIDTH: u32 = 0xB0;
    pub const PIXEL_HEIGHT: u32 = 0xBA;
    pub const AUDIO: u32 = 0xE1;
    pub const SAMPLING_FREQUENCY: u32 = 0xB5;
    pub const CHANNELS: u32 = 0x9F;
    pub const BIT_DEPTH: u32 = 0x6264;

    pub const CLUSTER: u32 = 0x1F43_B675;
    pub const TIMECODE: u32 = 0xE7;
    pub const POSITION: u32 = 0xA7;
    pub const PREV_SIZE: u32 = 0xAB;
    pub const SIMPLE_BLOCK: u32 = 0xA3;
    pub const BLOCK_GROUP: u32 = 0xA0;
    pub const BLOCK: u32 = 0xA1;
    pub const BLOCK_DURATION: u32 = 0x9B;
    pub const REFERENCE_BLOCK: u32 = 0xFB;

    pub const CUES: u32 = 0x1C53_BB6B;
    pub const CUE_POINT: u32 = 0xBB;
    pub const CUE_TIME: u32 = 0xB3;
    pub const CUE_TRACK_POSITIONS: u32 = 0xB7;
    pub const CUE_TRACK: u32 = 0xF7;
    pub const CUE_CLUSTER_POSITION: u32 = 0xF1;
    pub const CUE_RELATIVE_POSITION: u32 = 0xF0;

    pub const TAGS: u32 = 0x1254_C367;
    pub const TAG: u32 = 0x7373;
    pub const TARGETS: u32 = 0x63C0;
    pub const SIMPLE_TAG: u32 = 0x67C8;
    pub const TAG_NAME: u32 = 0x45A3;
    pub const TAG_STRING: u32 = 0x4487;

    pub const CHAPTERS: u32 = 0x1043_A770;
    pub const ATTACHMENTS: u32 = 0x1941_A469;
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Kind {
    Master,
    Unsigned,
    Signed,
    Float,
    String,
    Utf8,
    Date,
    Binary,
}

#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum Parent {
    /// Top level of the stream.
    Root,
    Element(u32),
    /// Allowed under any master (Void, CRC-32).
    Any,
}

#[derive(Debug, Clone, Copy)]
pub struct ElementSpec {
    pub id: u32,
    pub name: &'static str,
    pub kind: Kind,
    pub parent: Parent,
}

macro_rules! spec {
    ($id:expr, $name:literal, $kind:ident, root) => {
        ElementSpec { id: $id, name: $name, kind: Kind::$kind, parent: Parent::Root }
    };
    ($id:expr, $name:literal, $kind:ident, any) => {
        ElementSpec { id: $id, name: $name, kind: Kind::$kind, parent: Parent::Any }
    };
    ($id:expr, $name:literal, $kind:ident, $parent:expr) => {
        ElementSpec { id: $id, name: $name, kind: Kind::$kind, parent: Parent::Element($parent) }
    };
}

use ids::*;

static TABLE: &[ElementSpec] = &[
    spec!(EBML, "EBML", Master, root),
    spec!(EBML_VERSION, "EBMLVersion", Unsigned, EBML),
    spec!(EBML_READ_VERSION, "EBMLReadVersion", Unsigned, EBML),
    spec!(EBML_MAX_ID_LENGTH, "EBMLMaxIDLength", Unsigned, EBML),
    spec!(EBML_MAX_SIZE_LENGTH, "EBMLMaxSizeLength", Unsigned, EBML),
    spec!(DOC_TYPE, "DocType", String, EBML),
    spec!(DOC_TYPE_VERSION, "DocTypeVersion", Unsigned, EBML),
    spec!(DOC_TYPE_READ_VERSION, "DocTypeReadVersion", Unsigned, EBML),
    spec!(VOID, "Void", Binary, any),
    spec!(CRC32, "CRC-32", Binary, any),
    spec!(SEGMENT, "Segment", Master, root),
    spec!(SEEK_HEAD, "SeekHead", Master, SEGMENT),
    spec!(SEEK, "Seek", Master, SEEK_HEAD),
    spec!(SEEK_ID, "SeekID", Binary, SEEK),
    spec!(SEEK_POSITION, "SeekPosition", Unsigned, SEEK),
    spec!(INFO, "Info", Master, SEGMENT),
    spec!(TIMECODE_SCALE, "TimecodeScale", Unsigned, INFO),
    spec!(DURATION, "Duration", Float, INFO),
    spec!(DATE_UTC, "DateUTC", Date, INFO),
    spec!(TITLE, "Title", Utf8, INFO),
    spec!(MUXING_APP, "MuxingApp", Utf8, INFO),
    spec!(WRITING_APP, "WritingApp", Utf8, INFO),
    spec!(SEGMENT_UID, "SegmentUID", Binary, INFO),
    spec!(TRACKS, "Tracks", Master, SEGMENT),
    spec!(TRACK_ENTRY, "TrackEntry", Master, TRACKS),
    spec!(TRACK_NUMBER, "TrackNumber", Unsigned, TRACK_ENTRY),
    spec!(TRACK_UID, "TrackUID", Unsigned, TRACK_ENTRY),
    spec!(TRACK_TYPE, "TrackType", Unsigned, TRACK_ENTRY),
    spec!(FLAG_LACING, "FlagLacing", Unsigned, TRACK_ENTRY),
    spec!(DEFAULT_DURATION, "DefaultDuration", Unsigned, TRACK_ENTRY),
    spec!(NAME, "Name", Utf8, TRACK_ENTRY),
    spec!(LANGUAGE, "Language", String, TRACK_ENTRY),
    spec!(CODEC_ID, "CodecID", String, TRACK_ENTRY),
    spec!(CODEC_PRIVATE, "CodecPrivate", Binary, TRACK_ENTRY),
    spec!(CODEC_NAME, "CodecName", Utf8, TRACK_ENTRY),
    spec!(VIDEO, "Video", Master, TRACK_ENTRY),
    spec!(PIXEL_WIDTH, "PixelWidth", Unsigned, VIDEO),
    spec!(PIXEL_HEIGHT, "PixelHeight", Unsigned, VIDEO),
    spec!(AUDIO, "Audio", Master, TRACK_ENTRY),
    spec!(SAMPLING_FREQUENCY, "SamplingFrequency", Float, AUDIO),
    spec!(CHANNELS, "Channels", Unsigned, AUDIO),
    spec!(BIT_DEPTH, "BitDepth", Unsigned, AUDIO),
    spec!(CLUSTER, "Cluster", Master, SEGMENT),
    spec!(TIMECODE, "Timecode", Unsigned, CLUSTER),
    spec!(POSITION, "Position", Unsigned, CLUSTER),
    spec!(PREV_SIZE, "PrevSize", Unsigned, CLUSTER),
    spec!(SIMPLE_BLOCK, "SimpleBlock", Binary, CLUSTER),
    spec!(BLOCK_GROUP, "BlockGroup", Master, CLUSTER),
    spec!(BLOCK, "Block", Binary, BLOCK_GROUP),
    spec!(BLOCK_DURATION, "BlockDuration", Unsigned, BLOCK_GROUP),
    spec!(REFERENCE_BLOCK, "ReferenceBlock", Signed, BLOCK_GROUP),
    spec!(CUES, "Cues", Master, SEGMENT),
    spec!(CUE_POINT, "CuePoint", Master, CUES),
    spec!(CUE_TIME, "CueTime", Unsigned, CUE_POINT),
    spec!(CUE_TRACK_POSITIONS, "CueTrackPositions", Master, CUE_POINT),
    spec!(CUE_TRACK, "CueTrack", Unsigned, CUE_TRACK_POSITIONS),
    spec!(CUE_CLUSTER_POSITION, "CueClusterPosition", Unsigned, CUE_TRACK_POSITIONS),
    spec!(CUE_RELATIVE_POSITION, "CueRelativePosition", Unsigned, CUE_TRACK_POSITIONS),
    spec!(TAGS, "Tags", Master, SEGMENT),
    spec!(TAG, "Tag", Master, TAGS),
    spec!(TARGETS, "Targets", Master, TAG),
    spec!(SIMPLE_TAG, "SimpleTag", Master, TAG),
    spec!(TAG_NAME, "TagName", Utf8, SIMPLE_TAG),
    spec!(TAG_STRING, "TagString", Utf8, SIMPLE_TAG),
    spec!(CHAPTERS, "Chapters", Master, SEGMENT),
    spec!(ATTACHMENTS, "Attachments", Master, SEGMENT),
];

pub fn lookup(id: u32) -> Option<&'static ElementSpec> {
    TABLE.iter().find(|s| s.id == id)
}

pub fn name(id: u32) -> &'static str {
    lookup(id).map(|s| s.name).unwrap_or("Unknown")
}

pub fn is_master(id: u32) -> bool {
    matches!(lookup(id), Some(ElementSpec { kind: Kind::Master, .. }))
}
