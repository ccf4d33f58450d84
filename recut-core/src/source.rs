//! Trimmed media sources and ordered source lists.
//!
//! A [`MediaFile`] describes one input with optional trim segments; a
//! [`SourceList`] is the ordered sequence of files composing one logical
//! multi-file source. The list is snapshotted by the pipeline at resolution
//! time; mutating it during a run has no effect on that run.

use crate::error::{Error, Result};
use serde::{Deserialize, Serialize};
use std::fmt;
use std::path::PathBuf;
use std::sync::atomic::{AtomicU64, Ordering};

/// Where a media file lives. Exactly one variant is set per file.
#[derive(Debug, Clone, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub enum MediaLocator {
    /// Filesystem path.
    Path(PathBuf),
    /// Already-open file descriptor.
    Descriptor(i32),
    /// Remote or scheme-addressed resource.
    Uri(String),
}

impl MediaLocator {
    /// Create a path locator.
    pub fn path(p: impl Into<PathBuf>) -> Self {
        Self::Path(p.into())
    }

    /// Create a URI locator.
    pub fn uri(u: impl Into<String>) -> Self {
        Self::Uri(u.into())
    }
}

impl fmt::Display for MediaLocator {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        match self {
            Self::Path(p) => write!(f, "{}", p.display()),
            Self::Descriptor(fd) => write!(f, "fd:{}", fd),
            Self::Uri(u) => write!(f, "{}", u),
        }
    }
}

/// A sub-range of a file's native timeline, in microseconds.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Serialize, Deserialize)]
pub struct Segment {
    /// Inclusive start on the native timeline.
    pub start_us: i64,
    /// Exclusive end on the native timeline.
    pub end_us: i64,
}

impl Segment {
    /// Create a segment. Fails unless `start_us < end_us`.
    pub fn new(start_us: i64, end_us: i64) -> Result<Self> {
        if start_us >= end_us {
            return Err(Error::invalid_param(format!(
                "segment start {} must precede end {}",
                start_us, end_us
            )));
        }
        Ok(Self { start_us, end_us })
    }

    /// Length of the segment in microseconds.
    pub fn duration_us(&self) -> i64 {
        self.end_us - self.start_us
    }

    /// Check whether a timestamp falls within the segment.
    pub fn contains(&self, time_us: i64) -> bool {
        time_us >= self.start_us && time_us < self.end_us
    }
}

/// Process-unique identity for a source file entry.
///
/// Removal from a [`SourceList`] matches on this identity, never on
/// positional index or structural equality.
#[derive(Debug, Clone, Copy, PartialEq, Eq, Hash, Serialize, Deserialize)]
pub struct FileId(u64);

impl FileId {
    fn next() -> Self {
        static COUNTER: AtomicU64 = AtomicU64::new(0);
        Self(COUNTER.fetch_add(1, Ordering::SeqCst))
    }

    /// Get the raw ID value.
    pub fn raw(&self) -> u64 {
        self.0
    }
}

/// One source media file with optional trim segments.
///
/// A file with no segments contributes its full native duration; otherwise
/// it contributes the naive sum of its segment lengths. Segments are kept
/// exactly as the caller supplied them: unsorted or overlapping segments are
/// not rejected or merged.
#[derive(Debug, Clone, Serialize, Deserialize)]
pub struct MediaFile {
    id: FileId,
    /// Location of the file.
    pub locator: MediaLocator,
    /// Full native duration of the file in microseconds.
    pub native_duration_us: i64,
    segments: Vec<Segment>,
}

impl MediaFile {
    /// Create a new media file entry.
    pub fn new(locator: MediaLocator, native_duration_us: i64) -> Self {
        Self {
            id: FileId::next(),
            locator,
            native_duration_us,
            segments: Vec::new(),
        }
    }

    /// Identity of this entry.
    pub fn id(&self) -> FileId {
        self.id
    }

    /// Add a trim segment.
    pub fn add_segment(&mut self, segment: Segment) {
        self.segments.push(segment);
    }

    /// Add a trim segment, builder style.
    pub fn with_segment(mut self, segment: Segment) -> Self {
        self.segments.push(segment);
        self
    }

    /// The caller-supplied trim segments, in insertion order.
    pub fn segments(&self) -> &[Segment] {
        &self.segments
    }

    /// Effective duration: sum of segment lengths, or the native duration
    /// when no segments were set.
    pub fn duration_us(&self) -> i64 {
        if self.segments.is_empty() {
            self.native_duration_us
        } else {
            self.segments.iter().map(Segment::duration_us).sum()
        }
    }

    /// Segments to play, with the implicit full-range segment materialized
    /// for files that have none.
    pub fn effective_segments(&self) -> Vec<Segment> {
        if self.segments.is_empty() {
            vec![Segment {
                start_us: 0,
                end_us: self.native_duration_us,
            }]
        } else {
            self.segments.clone()
        }
    }
}

/// Ordered sequence of media files composing one logical source.
#[derive(Debug, Clone, Default, Serialize, Deserialize)]
pub struct SourceList {
    files: Vec<MediaFile>,
}

impl SourceList {
    /// Create an empty source list.
    pub fn new() -> Self {
        Self::default()
    }

    /// Append a file at the end.
    pub fn append(&mut self, file: MediaFile) {
        self.files.push(file);
    }

    /// Insert a file at `index`. An index past the end appends.
    pub fn insert(&mut self, index: usize, file: MediaFile) {
        let index = index.min(self.files.len());
        self.files.insert(index, file);
    }

    /// Remove an entry by identity. Removing an absent entry is a no-op.
    pub fn remove(&mut self, file: &MediaFile) {
        self.files.retain(|f| f.id != file.id);
    }

    /// The files in order.
    pub fn files(&self) -> &[MediaFile] {
        &self.files
    }

    /// Number of entries.
    pub fn len(&self) -> usize {
        self.files.len()
    }

    /// Check if the list is empty.
    pub fn is_empty(&self) -> bool {
        self.files.is_empty()
    }

    /// Total effective duration across all entries, recomputed on every
    /// call so it is never stale after a mutation.
    pub fn total_duration_us(&self) -> i64 {
        self.files.iter().map(MediaFile::duration_us).sum()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    fn file(name: &str, duration_us: i64) -> MediaFile {
        MediaFile::new(MediaLocator::path(name), duration_us)
    }

    #[test]
    fn test_segment_rejects_inverted_range() {
        assert!(Segment::new(100, 100).is_err());
        assert!(Segment::new(200, 100).is_err());
        assert!(Segment::new(0, 1).is_ok());
    }

    #[test]
    fn test_untrimmed_duration_is_native() {
        let mut list = SourceList::new();
        list.append(file("a.mp4", 1_000));
        list.append(file("b.mp4", 2_500));
        assert_eq!(list.total_duration_us(), 3_500);
    }

    #[test]
    fn test_single_segment_duration() {
        let f = file("a.mp4", 1_000).with_segment(Segment::new(0, 150).unwrap());
        assert_eq!(f.duration_us(), 150);
    }

    #[test]
    fn test_multi_segment_duration() {
        let f = file("a.mp4", 1_000)
            .with_segment(Segment::new(0, 150).unwrap())
            .with_segment(Segment::new(500, 600).unwrap());
        assert_eq!(f.duration_us(), 250);
    }

    #[test]
    fn test_overlapping_segments_sum_naively() {
        // Overlapping and reverse-ordered segments are accepted and summed
        // without merging. Legacy-preserving behavior.
        let f = file("a.mp4", 1_000)
            .with_segment(Segment::new(500, 700).unwrap())
            .with_segment(Segment::new(400, 600).unwrap());
        assert_eq!(f.duration_us(), 400);
    }

    #[test]
    fn test_insert_at_front_preserves_order() {
        let mut list = SourceList::new();
        list.append(file("last.mp4", 10));
        list.insert(0, file("first.mp4", 10));
        let names: Vec<String> = list.files().iter().map(|f| f.locator.to_string()).collect();
        assert_eq!(names, vec!["first.mp4", "last.mp4"]);
    }

    #[test]
    fn test_insert_past_end_appends() {
        let mut list = SourceList::new();
        list.append(file("a.mp4", 10));
        list.insert(99, file("b.mp4", 10));
        let names: Vec<String> = list.files().iter().map(|f| f.locator.to_string()).collect();
        assert_eq!(names, vec!["a.mp4", "b.mp4"]);
    }

    #[test]
    fn test_remove_middle_by_identity() {
        let mut list = SourceList::new();
        list.append(file("1.mp4", 10));
        let middle = file("2.mp4", 10);
        let handle = middle.clone();
        list.append(middle);
        list.append(file("3.mp4", 10));

        list.remove(&handle);
        let names: Vec<String> = list.files().iter().map(|f| f.locator.to_string()).collect();
        assert_eq!(names, vec!["1.mp4", "3.mp4"]);
    }

    #[test]
    fn test_remove_absent_is_noop() {
        let mut list = SourceList::new();
        list.append(file("a.mp4", 10));
        let stranger = file("a.mp4", 10); // same path, different identity
        list.remove(&stranger);
        assert_eq!(list.len(), 1);
    }

    #[test]
    fn test_duration_not_stale_after_mutation() {
        let mut list = SourceList::new();
        let a = file("a.mp4", 1_000);
        let handle = a.clone();
        list.append(a);
        list.append(file("b.mp4", 2_000));
        assert_eq!(list.total_duration_us(), 3_000);
        list.remove(&handle);
        assert_eq!(list.total_duration_us(), 2_000);
    }

    #[test]
    fn test_effective_segments_implicit_full_range() {
        let f = file("a.mp4", 1_000);
        let segs = f.effective_segments();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].start_us, 0);
        assert_eq!(segs[0].end_us, 1_000);
    }

    #[test]
    fn test_source_list_serde_roundtrip() {
        let mut list = SourceList::new();
        list.append(file("a.mp4", 1_000).with_segment(Segment::new(0, 500).unwrap()));
        let json = serde_json::to_string(&list).unwrap();
        let back: SourceList = serde_json::from_str(&json).unwrap();
        assert_eq!(back.total_duration_us(), 500);
    }
}
