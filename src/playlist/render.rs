//! Pure M3U8 renderer (C3). `render` is an idempotent function of a
//! [`PlaylistSnapshot`] — no I/O, no fallible path, matching the contract in
//! the component design: the renderer cannot fail on well-formed in-memory
//! state.

use std::fmt::Write as _;

use crate::model::{
    ByteRange, LivePlaylistMetadata, LiveSegment, PartialSegment, PlaylistType, PreloadHint,
    RenditionReport, ServerControl, SkipInfo,
};

/// A group of partials belonging to one segment index, used both for
/// completed segments (rendered before that segment's `#EXTINF`) and for
/// the in-progress "current" segment (rendered after the last completed
/// segment's URI).
#[derive(Debug, Clone, Default)]
pub struct PartialGroup {
    pub segment_index: u64,
    pub partials: Vec<PartialSegment>,
}

/// Everything the renderer needs to produce one M3U8 text. This is a value
/// — cheap to construct from a manager's internal state and safe to render
/// more than once.
#[derive(Debug, Clone, Default)]
pub struct PlaylistSnapshot {
    pub target_duration: u64,
    pub media_sequence: u64,
    pub discontinuity_sequence: u64,
    pub playlist_type: Option<PlaylistType>,
    pub segments: Vec<LiveSegment>,
    pub part_target_duration: Option<f64>,
    /// Partial groups for completed segments still in the retained window,
    /// keyed by the segment they extend (only meaningful for the segments
    /// that were still in progress when their partials were captured).
    pub completed_partial_groups: Vec<PartialGroup>,
    /// Partials accumulated on the segment that has not completed yet.
    pub in_progress_partials: Option<PartialGroup>,
    pub preload_hint: Option<PreloadHint>,
    pub server_control: Option<ServerControl>,
    pub rendition_reports: Vec<RenditionReport>,
    pub skip: Option<SkipInfo>,
    pub metadata: LivePlaylistMetadata,
    pub has_end_list: bool,
}

/// Serialize a [`PlaylistSnapshot`] to RFC 8216 / LL-HLS text.
///
/// Byte-exact formatting per the wire-format section: uppercase tag and
/// attribute names, no spaces around `,`, double-quoted strings, `\n` line
/// endings with a final trailing newline.
pub fn generate(snapshot: &PlaylistSnapshot) -> String {
    let mut out = String::with_capacity(256 + snapshot.segments.len() * 96);

    writeln!(out, "#EXTM3U").unwrap();

    let version = required_version(snapshot);
    if version > 1 {
        writeln!(out, "#EXT-X-VERSION:{version}").unwrap();
    }

    writeln!(out, "#EXT-X-TARGETDURATION:{}", snapshot.target_duration).unwrap();
    writeln!(out, "#EXT-X-MEDIA-SEQUENCE:{}", snapshot.media_sequence).unwrap();
    if snapshot.discontinuity_sequence != 0 {
        writeln!(
            out,
            "#EXT-X-DISCONTINUITY-SEQUENCE:{}",
            snapshot.discontinuity_sequence
        )
        .unwrap();
    }

    match snapshot.playlist_type {
        Some(PlaylistType::Vod) => writeln!(out, "#EXT-X-PLAYLIST-TYPE:VOD").unwrap(),
        Some(PlaylistType::Event) => writeln!(out, "#EXT-X-PLAYLIST-TYPE:EVENT").unwrap(),
        Some(PlaylistType::None) | None => {}
    }

    if snapshot.metadata.independent_segments {
        writeln!(out, "#EXT-X-INDEPENDENT-SEGMENTS").unwrap();
    }
    if let Some(offset) = snapshot.metadata.start_offset {
        writeln!(out, "#EXT-X-START:TIME-OFFSET={offset:.3}").unwrap();
    }
    for tag in &snapshot.metadata.custom_tags {
        writeln!(out, "{tag}").unwrap();
    }

    if let Some(sc) = &snapshot.server_control {
        write_server_control(&mut out, sc);
    }

    if let Some(part_target) = snapshot.part_target_duration {
        writeln!(out, "#EXT-X-PART-INF:PART-TARGET={part_target:.5}").unwrap();
    }

    if let Some(skip) = &snapshot.skip {
        write_skip(&mut out, skip);
    }

    write_segments(&mut out, snapshot);

    for report in &snapshot.rendition_reports {
        write_rendition_report(&mut out, report);
    }

    if let (false, Some(hint)) = (snapshot.has_end_list, &snapshot.preload_hint) {
        write_preload_hint(&mut out, hint);
    }

    if snapshot.has_end_list {
        writeln!(out, "#EXT-X-ENDLIST").unwrap();
    }

    out
}

fn write_server_control(out: &mut String, sc: &ServerControl) {
    let mut attrs = Vec::new();
    attrs.push(format!(
        "CAN-BLOCK-RELOAD={}",
        if sc.can_block_reload { "YES" } else { "NO" }
    ));
    if let Some(hold_back) = sc.hold_back {
        attrs.push(format!("HOLD-BACK={}", format_decimal_min1(hold_back)));
    }
    if let Some(part_hold_back) = sc.part_hold_back {
        attrs.push(format!(
            "PART-HOLD-BACK={}",
            format_decimal_min1(part_hold_back)
        ));
    }
    if let Some(can_skip_until) = sc.can_skip_until {
        attrs.push(format!(
            "CAN-SKIP-UNTIL={}",
            format_decimal_min1(can_skip_until)
        ));
        if sc.can_skip_dateranges {
            attrs.push("CAN-SKIP-DATERANGES=YES".to_string());
        }
    }
    writeln!(out, "#EXT-X-SERVER-CONTROL:{}", attrs.join(",")).unwrap();
}

fn write_skip(out: &mut String, skip: &SkipInfo) {
    if skip.recently_removed_dateranges.is_empty() {
        writeln!(
            out,
            "#EXT-X-SKIP:SKIPPED-SEGMENTS={}",
            skip.skipped_segments
        )
        .unwrap();
    } else {
        writeln!(
            out,
            "#EXT-X-SKIP:SKIPPED-SEGMENTS={},RECENTLY-REMOVED-DATERANGES=\"{}\"",
            skip.skipped_segments,
            skip.recently_removed_dateranges.join("\t")
        )
        .unwrap();
    }
}

fn write_segments(out: &mut String, snapshot: &PlaylistSnapshot) {
    let skipped = snapshot
        .skip
        .as_ref()
        .map(|s| s.skipped_segments as usize)
        .unwrap_or(0);

    let mut prev_key: Option<&crate::model::SegmentKey> = None;
    let mut prev_map: Option<&str> = None;
    let mut prev_bitrate: Option<u64> = None;
    let mut key_seen = false;
    let mut map_seen = false;

    for (i, seg) in snapshot.segments.iter().enumerate() {
        if i < skipped {
            continue;
        }

        if let Some(group) = snapshot
            .completed_partial_groups
            .iter()
            .find(|g| g.segment_index == seg.index)
        {
            for part in &group.partials {
                write_part(out, part);
            }
        }

        if seg.discontinuity {
            writeln!(out, "#EXT-X-DISCONTINUITY").unwrap();
        }
        if let Some(pdt) = seg.program_date_time {
            writeln!(
                out,
                "#EXT-X-PROGRAM-DATE-TIME:{}",
                pdt.to_rfc3339_opts(chrono::SecondsFormat::Millis, true)
            )
            .unwrap();
        }

        if !key_seen || seg.key.as_ref() != prev_key {
            if let Some(k) = &seg.key {
                write_key(out, k);
            }
            prev_key = seg.key.as_ref();
            key_seen = true;
        }

        if !map_seen || seg.map_uri.as_deref() != prev_map {
            if let Some(m) = &seg.map_uri {
                writeln!(out, "#EXT-X-MAP:URI=\"{m}\"").unwrap();
            }
            prev_map = seg.map_uri.as_deref();
            map_seen = true;
        }

        if let Some(bitrate) = seg.bitrate {
            if prev_bitrate != Some(bitrate) {
                writeln!(out, "#EXT-X-BITRATE:{bitrate}").unwrap();
                prev_bitrate = Some(bitrate);
            }
        }

        if seg.is_gap {
            writeln!(out, "#EXT-X-GAP").unwrap();
        }

        if let Some(br) = seg.byte_range {
            write_byte_range(out, &br);
        }

        writeln!(out, "#EXTINF:{:.5},", seg.duration).unwrap();
        writeln!(out, "{}", seg.filename).unwrap();
    }

    if let Some(group) = &snapshot.in_progress_partials {
        for part in &group.partials {
            write_part(out, part);
        }
    }
}

fn write_key(out: &mut String, key: &crate::model::SegmentKey) {
    let mut attrs = format!("METHOD={},URI=\"{}\"", key.method, key.uri);
    if let Some(iv) = key.iv {
        attrs.push_str(&format!(",IV=0x{}", hex(&iv)));
    }
    if let Some(fmt) = &key.keyformat {
        attrs.push_str(&format!(",KEYFORMAT=\"{fmt}\""));
    }
    if let Some(versions) = &key.keyformatversions {
        attrs.push_str(&format!(",KEYFORMATVERSIONS=\"{versions}\""));
    }
    writeln!(out, "#EXT-X-KEY:{attrs}").unwrap();
}

fn hex(bytes: &[u8]) -> String {
    bytes.iter().map(|b| format!("{b:02x}")).collect()
}

fn write_part(out: &mut String, part: &PartialSegment) {
    let mut attrs = format!(
        "DURATION={:.5},URI=\"{}\"",
        part.duration, part.uri
    );
    if part.is_independent {
        attrs.push_str(",INDEPENDENT=YES");
    }
    if part.is_gap {
        attrs.push_str(",GAP=YES");
    }
    if let Some(br) = part.byte_range {
        attrs.push_str(&format!(",BYTERANGE=\"{}\"", byte_range_value(&br)));
    }
    writeln!(out, "#EXT-X-PART:{attrs}").unwrap();
}

fn write_preload_hint(out: &mut String, hint: &PreloadHint) {
    let mut attrs = format!("TYPE=PART,URI=\"{}\"", hint.uri);
    if let Some(br) = hint.byte_range {
        attrs.push_str(&format!(",BYTERANGE=\"{}\"", byte_range_value(&br)));
    }
    writeln!(out, "#EXT-X-PRELOAD-HINT:{attrs}").unwrap();
}

fn write_rendition_report(out: &mut String, report: &RenditionReport) {
    let mut attrs = format!("URI=\"{}\"", report.uri);
    if let Some(msn) = report.last_media_sequence {
        attrs.push_str(&format!(",LAST-MSN={msn}"));
    }
    if let Some(part) = report.last_part_index {
        attrs.push_str(&format!(",LAST-PART={part}"));
    }
    writeln!(out, "#EXT-X-RENDITION-REPORT:{attrs}").unwrap();
}

fn write_byte_range(out: &mut String, br: &ByteRange) {
    writeln!(out, "#EXT-X-BYTERANGE:{}", byte_range_value(br)).unwrap();
}

fn byte_range_value(br: &ByteRange) -> String {
    match br.offset {
        Some(offset) => format!("{}@{}", br.length, offset),
        None => format!("{}", br.length),
    }
}

fn format_decimal_min1(value: f64) -> String {
    if value.fract() == 0.0 {
        format!("{value:.1}")
    } else {
        let s = format!("{value}");
        s
    }
}

/// Minimum `EXT-X-VERSION` implied by the features used in `snapshot`,
/// per §4.1.
fn required_version(snapshot: &PlaylistSnapshot) -> u32 {
    let mut version = 1;

    // Decimal segment durations.
    if snapshot.segments.iter().any(|s| s.duration.fract() != 0.0) {
        version = version.max(3);
    }
    if snapshot.segments.iter().any(|s| s.byte_range.is_some()) {
        version = version.max(4);
    }
    if snapshot
        .segments
        .iter()
        .any(|s| s.key.as_ref().and_then(|k| k.iv).is_some())
    {
        version = version.max(2);
    }
    if snapshot.segments.iter().any(|s| {
        s.key
            .as_ref()
            .map(|k| k.keyformat.is_some() || k.keyformatversions.is_some())
            .unwrap_or(false)
    }) {
        version = version.max(5);
    }
    if snapshot.segments.iter().any(|s| s.map_uri.is_some()) {
        version = version.max(6);
    }
    if snapshot.metadata.start_offset.is_some() {
        version = version.max(7);
    }
    let has_ll_hls = snapshot.part_target_duration.is_some()
        || snapshot.preload_hint.is_some()
        || !snapshot.completed_partial_groups.is_empty()
        || snapshot.in_progress_partials.is_some()
        || snapshot.skip.is_some();
    if has_ll_hls {
        version = version.max(9);
    }

    version
}
