//! Pump-history normalizer (spec §4.3).
//!
//! Turns the raw, chronologically unordered [`PumpEvent`] stream into a
//! flat, IOB-ready [`Treatment`] list: real boluses plus synthetic
//! micro-boluses standing in for every temp-basal segment. The pipeline is
//! a sequence of passes over contiguous `Vec`s of segments indexed by
//! position (arena + indices, per the design notes) rather than a graph of
//! shared segment ownership.

use chrono::{DateTime, Duration, Utc};

use crate::error::OrefError;
use crate::profile::basal_lookup;
use crate::types::{Profile, PumpEvent, Treatment};

/// One contiguous temp-basal rate interval after pairing/truncation/
/// suspend-splitting but before the final boundary split and micro-bolus
/// conversion.
#[derive(Debug, Clone, Copy, PartialEq)]
struct TempSegment {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
    rate: f64,
    /// Segments created to represent a suspend window are real IOB-zero
    /// intervals but must not feed back into temp-basal history display.
    omit_from_temp_history: bool,
}

impl TempSegment {
    fn duration_minutes(&self) -> f64 {
        (self.end - self.start).num_milliseconds() as f64 / 60_000.0
    }
}

/// Step 1: pair `TempBasal{rate}` with `TempBasalDuration{minutes}` on
/// identical timestamps.
fn pair_temp_basals(events: &[PumpEvent]) -> Result<Vec<TempSegment>, OrefError> {
    let mut rates: Vec<(DateTime<Utc>, f64)> = Vec::new();
    let mut durations: Vec<(DateTime<Utc>, f64)> = Vec::new();

    for e in events {
        match e {
            PumpEvent::TempBasal { timestamp, rate } => rates.push((*timestamp, *rate)),
            PumpEvent::TempBasalDuration { timestamp, minutes } => durations.push((*timestamp, *minutes)),
            _ => {}
        }
    }

    let mut segments = Vec::with_capacity(rates.len());
    for (ts, rate) in &rates {
        let minutes = durations
            .iter()
            .find(|(dts, _)| dts == ts)
            .map(|(_, m)| *m)
            .ok_or(OrefError::TempBasalMissingDuration(*ts))?;
        segments.push(TempSegment {
            start: *ts,
            end: *ts + Duration::milliseconds((minutes * 60_000.0) as i64),
            rate: *rate,
            omit_from_temp_history: false,
        });
    }
    for (ts, _) in &durations {
        if !rates.iter().any(|(rts, _)| rts == ts) {
            return Err(OrefError::TempBasalDurationMismatch(*ts));
        }
    }
    segments.sort_by_key(|s| s.start);
    Ok(segments)
}

/// Step 2: cap the active temp at `clock` by appending a synthetic
/// zero-length-rate marker; `extend_minutes` is 240 for the
/// "with zero temp" IOB pathway, 1 otherwise.
fn append_zero_temp(mut segments: Vec<TempSegment>, clock: DateTime<Utc>, extend_minutes: i64) -> Vec<TempSegment> {
    segments.push(TempSegment {
        start: clock,
        end: clock + Duration::minutes(extend_minutes),
        rate: 0.0,
        omit_from_temp_history: false,
    });
    segments.sort_by_key(|s| s.start);
    segments
}

/// Step 3: if segment N ends after segment N+1 begins, shorten N.
fn truncate_overlaps(mut segments: Vec<TempSegment>) -> Vec<TempSegment> {
    for i in 0..segments.len().saturating_sub(1) {
        if segments[i].end > segments[i + 1].start {
            segments[i].end = segments[i + 1].start;
        }
    }
    segments.retain(|s| s.end > s.start);
    segments
}

#[derive(Debug, Clone, Copy)]
struct SuspendWindow {
    start: DateTime<Utc>,
    end: DateTime<Utc>,
}

/// Step 4: suspend reconstruction. Deduplicates consecutive same-type
/// suspend/resume events (a malformed pair is an error per §4.3's failure
/// model), then pairs them into windows; a leading resume or trailing
/// suspend is synthesized against `clock`/the lookback window.
fn reconstruct_suspends(
    events: &[PumpEvent],
    clock: DateTime<Utc>,
    lookback: Duration,
) -> Result<Vec<SuspendWindow>, OrefError> {
    #[derive(PartialEq, Clone, Copy)]
    enum Kind {
        Suspend,
        Resume,
    }
    let mut marks: Vec<(DateTime<Utc>, Kind)> = events
        .iter()
        .filter_map(|e| match e {
            PumpEvent::PumpSuspend { timestamp } => Some((*timestamp, Kind::Suspend)),
            PumpEvent::PumpResume { timestamp } => Some((*timestamp, Kind::Resume)),
            _ => None,
        })
        .collect();
    marks.sort_by_key(|(t, _)| *t);

    let mut dedup: Vec<(DateTime<Utc>, Kind)> = Vec::with_capacity(marks.len());
    for m in marks.drain(..) {
        if let Some(last) = dedup.last() {
            if last.1 == m.1 {
                return Err(OrefError::PumpSuspendResumeMismatch(m.0));
            }
        }
        dedup.push(m);
    }

    let mut windows = Vec::new();
    let mut iter = dedup.into_iter().peekable();

    if let Some(&(ts, Kind::Resume)) = iter.peek() {
        // isSuspendedPrior: synthesize a suspend starting max(36h ago, resume - lookback)
        let synth_start = (clock - Duration::hours(36)).max(ts - lookback);
        windows.push(SuspendWindow { start: synth_start, end: ts });
        iter.next();
    }

    while let Some((start, kind)) = iter.next() {
        if kind != Kind::Suspend {
            continue;
        }
        match iter.peek().copied() {
            Some((end, Kind::Resume)) => {
                windows.push(SuspendWindow { start, end });
                iter.next();
            }
            None => {
                // isCurrentlySuspended: extend to clock
                windows.push(SuspendWindow { start, end: clock });
            }
            Some((_, Kind::Suspend)) => {
                // shouldn't happen post-dedup
            }
        }
    }

    Ok(windows)
}

/// Step 5: case-split each temp segment against each suspend window.
/// Produces the remaining temp segments plus one omitted zero-rate
/// segment per suspend window (so the suspend still zeros IOB even where
/// no temp basal originally overlapped it).
fn split_around_suspends(segments: Vec<TempSegment>, suspends: &[SuspendWindow]) -> Vec<TempSegment> {
    let mut result = segments;

    for window in suspends {
        let mut next_round = Vec::with_capacity(result.len() + 1);
        for seg in result {
            if seg.end <= window.start || seg.start >= window.end {
                // disjoint
                next_round.push(seg);
            } else if seg.start >= window.start && seg.end <= window.end {
                // (a) fully inside: drop
            } else if seg.start < window.start && seg.end <= window.end {
                // (b) starts before, ends inside: truncate
                next_round.push(TempSegment { end: window.start, ..seg });
            } else if seg.start >= window.start && seg.end > window.end {
                // (c) starts inside, ends after: move start to suspend end
                next_round.push(TempSegment { start: window.end, ..seg });
            } else {
                // (d) fully contains the suspend: split into two, second marked omit
                next_round.push(TempSegment { end: window.start, ..seg });
                next_round.push(TempSegment {
                    start: window.end,
                    omit_from_temp_history: true,
                    ..seg
                });
            }
        }
        next_round.push(TempSegment {
            start: window.start,
            end: window.end,
            rate: 0.0,
            omit_from_temp_history: true,
        });
        next_round.sort_by_key(|s| s.start);
        result = next_round;
    }

    result.retain(|s| s.end > s.start);
    result
}

/// Step 6: split on 30-minute boundaries, midnight, and profile-basal
/// schedule boundaries, so each resulting chunk sees exactly one
/// `profileBasalAt` value and carries duration forward in precise minutes.
fn split_on_boundaries(segments: Vec<TempSegment>, profile: &Profile) -> Vec<TempSegment> {
    let mut result = Vec::new();
    for seg in segments {
        let mut cursor = seg.start;
        while cursor < seg.end {
            let next_30 = round_up_to_30(cursor);
            let next_midnight = round_up_to_midnight(cursor);
            let next_profile_break = next_profile_boundary(cursor, profile);
            let boundary = next_30.min(next_midnight).min(next_profile_break).min(seg.end);
            result.push(TempSegment { start: cursor, end: boundary, ..seg });
            cursor = boundary;
        }
    }
    result
}

fn round_up_to_30(t: DateTime<Utc>) -> DateTime<Utc> {
    use chrono::Timelike;
    let minute = t.minute() as i64;
    let add = 30 - (minute % 30);
    let candidate = t + Duration::minutes(add);
    candidate
        .with_second(0)
        .unwrap_or(candidate)
        .with_nanosecond(0)
        .unwrap_or(candidate)
}

fn round_up_to_midnight(t: DateTime<Utc>) -> DateTime<Utc> {
    (t + Duration::days(1))
        .date_naive()
        .and_hms_opt(0, 0, 0)
        .map(|nd| DateTime::<Utc>::from_naive_utc_and_offset(nd, Utc))
        .unwrap_or(t + Duration::days(1))
}

fn next_profile_boundary(t: DateTime<Utc>, profile: &Profile) -> DateTime<Utc> {
    use chrono::Timelike;
    if profile.basal_profile.is_empty() {
        return t + Duration::days(1);
    }
    let now_minutes = (t.hour() * 60 + t.minute()) as i64;
    let mut offsets: Vec<i64> = profile.basal_profile.iter().map(|e| e.offset as i64).collect();
    offsets.sort_unstable();
    for off in &offsets {
        if *off as i64 > now_minutes {
            return t + Duration::minutes(*off - now_minutes);
        }
    }
    round_up_to_midnight(t)
}

/// Step 7: convert each boundary-split segment into synthetic micro-bolus
/// `Treatment`s. `netRate` sign is preserved; each micro-bolus is exactly
/// `bolus_increment` units, spaced uniformly across the segment.
fn segment_to_micro_boluses(seg: &TempSegment, profile: &Profile, autosens_ratio: f64) -> Vec<Treatment> {
    if seg.omit_from_temp_history {
        return Vec::new();
    }
    let profile_basal = basal_lookup(profile, seg.start);
    let net_rate = seg.rate - profile_basal * autosens_ratio;
    let minutes = seg.duration_minutes();
    if minutes <= 0.0 {
        return Vec::new();
    }
    let net_units = net_rate * minutes / 60.0;
    let increment = profile.bolus_increment.max(0.001);
    let count = crate::numeric::js_round(net_units / increment, 0).abs() as i64;
    if count == 0 {
        return Vec::new();
    }
    let per_bolus = increment * net_units.signum();
    let spacing_ms = (seg.end - seg.start).num_milliseconds() as f64 / count as f64;
    (0..count)
        .map(|i| {
            let ts = seg.start + Duration::milliseconds((spacing_ms * i as f64) as i64);
            Treatment::synthetic_micro_bolus(ts, per_bolus)
        })
        .collect()
}

pub struct NormalizeOptions {
    pub clock: DateTime<Utc>,
    pub autosens_ratio: f64,
    pub suspend_zeros_iob: bool,
    /// 240 for the "with zero temp" IOB pathway, 1 otherwise.
    pub zero_temp_extend_minutes: i64,
    pub history_window: Duration,
}

/// Run the full pipeline and merge real boluses with the synthetic
/// micro-boluses, sorted by timestamp (ties broken stably).
pub fn normalize(
    events: &[PumpEvent],
    profile: &Profile,
    opts: &NormalizeOptions,
) -> Result<Vec<Treatment>, OrefError> {
    let segments = pair_temp_basals(events)?;
    let segments = append_zero_temp(segments, opts.clock, opts.zero_temp_extend_minutes);
    let segments = truncate_overlaps(segments);

    let segments = if opts.suspend_zeros_iob {
        let suspends = reconstruct_suspends(events, opts.clock, opts.history_window)?;
        split_around_suspends(segments, &suspends)
    } else {
        segments
    };

    let segments = split_on_boundaries(segments, profile);

    let mut out: Vec<Treatment> = events
        .iter()
        .filter_map(|e| match e {
            PumpEvent::Bolus { timestamp, units } => Some(Treatment::bolus(*timestamp, *units)),
            _ => None,
        })
        .collect();

    for seg in &segments {
        out.extend(segment_to_micro_boluses(seg, profile, opts.autosens_ratio));
    }

    out.sort_by_key(|t| t.date);
    Ok(out)
}

#[cfg(test)]
mod tests {
    use super::*;
    use chrono::TimeZone;

    fn t(h: u32, m: u32) -> DateTime<Utc> {
        Utc.with_ymd_and_hms(2024, 1, 1, h, m, 0).unwrap()
    }

    #[test]
    fn pairs_temp_basal_with_duration() {
        let events = vec![
            PumpEvent::TempBasal { timestamp: t(1, 0), rate: 1.5 },
            PumpEvent::TempBasalDuration { timestamp: t(1, 0), minutes: 30.0 },
        ];
        let segs = pair_temp_basals(&events).unwrap();
        assert_eq!(segs.len(), 1);
        assert_eq!(segs[0].rate, 1.5);
    }

    #[test]
    fn missing_duration_is_an_error() {
        let events = vec![PumpEvent::TempBasal { timestamp: t(1, 0), rate: 1.5 }];
        assert!(matches!(pair_temp_basals(&events), Err(OrefError::TempBasalMissingDuration(_))));
    }

    #[test]
    fn overlapping_segments_are_truncated() {
        let segs = vec![
            TempSegment { start: t(1, 0), end: t(2, 0), rate: 1.0, omit_from_temp_history: false },
            TempSegment { start: t(1, 30), end: t(2, 30), rate: 2.0, omit_from_temp_history: false },
        ];
        let out = truncate_overlaps(segs);
        assert_eq!(out[0].end, t(1, 30));
    }

    #[test]
    fn suspend_window_zeros_iob_across_overlap() {
        let segs = vec![TempSegment { start: t(1, 0), end: t(2, 0), rate: 1.5, omit_from_temp_history: false }];
        let suspends = vec![SuspendWindow { start: t(1, 20), end: t(1, 40) }];
        let out = split_around_suspends(segs, &suspends);
        // Original temp split into [1:00-1:20) and [1:40-2:00), plus the suspend's own zero segment.
        assert_eq!(out.len(), 3);
    }

    #[test]
    fn normalize_merges_boluses_and_micro_boluses_sorted() {
        let profile = Profile { current_basal: 1.0, bolus_increment: 0.05, ..Default::default() };
        let events = vec![
            PumpEvent::Bolus { timestamp: t(3, 0), units: 1.0 },
            PumpEvent::TempBasal { timestamp: t(1, 0), rate: 2.0 },
            PumpEvent::TempBasalDuration { timestamp: t(1, 0), minutes: 30.0 },
        ];
        let opts = NormalizeOptions {
            clock: t(4, 0),
            autosens_ratio: 1.0,
            suspend_zeros_iob: false,
            zero_temp_extend_minutes: 1,
            history_window: Duration::hours(24),
        };
        let out = normalize(&events, &profile, &opts).unwrap();
        assert!(out.windows(2).all(|w| w[0].date <= w[1].date));
        assert!(out.iter().any(|tr| tr.insulin == 1.0 && !tr.is_temp_bolus));
    }
}
