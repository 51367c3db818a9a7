//! Linear and circular interpolation — the terminal link of the chain.

use std::collections::BTreeMap;

use crate::error::NcError;
use crate::handlers::{Emission, ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::{CncState, ModalGroup};
use crate::toolpath::Point;

/// Handles `G0/G1` linear and `G2/G3` circular moves (XY plane).
///
/// `max_segment` caps the emitted chord length so point counts grow with
/// geometry length; canned cycles build their own instance with a finer cap.
#[derive(Debug)]
pub struct MotionHandler {
    pub max_segment: f64,
    /// Traverse rate for rapids, units per minute. `None` → rapids use the
    /// programmed feed.
    pub rapid_rate: Option<f64>,
}

impl MotionHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        let line = node.diagnostic_line();

        let mut interp = None;
        for code in &node.g_code {
            if let Ok(n) = code.trim_start_matches(['G', 'g']).parse::<u32>() {
                if n <= 3 {
                    interp = Some(n);
                }
            }
        }
        // A block of bare axis words continues the active motion modal.
        if interp.is_none() && has_axis_words(ctx) {
            interp = match state.modal(ModalGroup::Motion) {
                Some("G00") => Some(0),
                Some("G01") => Some(1),
                Some("G02") => Some(2),
                Some("G03") => Some(3),
                _ => None,
            };
        }
        let Some(interp) = interp else {
            return Ok(Flow::Pass);
        };
        state.set_modal(ModalGroup::Motion, &format!("G{interp:02}"));

        let start = state.axes.clone();
        let end = self.resolve_end(state, ctx, line)?;
        for (&letter, &value) in &end {
            if !value.is_finite() {
                return Err(NcError::code_in(
                    line,
                    format!("non-finite target for axis {letter}"),
                    "",
                ));
            }
        }

        let emission = match interp {
            0 | 1 => self.linear(&start, &end, state, interp == 0),
            _ => self.circular(&start, &end, state, ctx, interp == 2, line)?,
        };

        state.update_axes(&end);
        Ok(Flow::Done(Some(emission)))
    }

    /// Resolves the block's target into absolute coordinates: direct axis
    /// words honour the distance modal, `U/V/W` words are deltas on the
    /// mapped linear axis regardless of it.
    fn resolve_end(
        &self,
        state: &CncState,
        ctx: &ExecContext,
        line: i64,
    ) -> Result<BTreeMap<char, f64>, NcError> {
        let mut direct = BTreeMap::new();
        let mut deltas = BTreeMap::new();
        for (&letter, literal) in &ctx.params {
            match letter {
                'X' | 'Y' | 'Z' | 'A' | 'B' | 'C' => {
                    direct.insert(letter, parse_number(literal, letter, line)?);
                }
                'U' | 'V' | 'W' => {
                    let mapped = match letter {
                        'U' => 'X',
                        'V' => 'Y',
                        _ => 'Z',
                    };
                    deltas.insert(mapped, parse_number(literal, letter, line)?);
                }
                _ => {} // I, J, K, R, F, S handled elsewhere
            }
        }

        let mut end = state.resolve_target(&direct, state.absolute_distance());
        for (letter, delta) in deltas {
            *end.entry(letter).or_insert_with(|| state.axis(letter)) += delta;
        }
        Ok(end)
    }

    fn linear(
        &self,
        start: &BTreeMap<char, f64>,
        end: &BTreeMap<char, f64>,
        state: &CncState,
        rapid: bool,
    ) -> Emission {
        let from = Point::from_axes(start);
        let to = Point::from_axes(end);
        let distance = from.linear_distance(&to);
        if distance <= 0.0 {
            return Emission::new(vec![to], 0.0);
        }
        let points = segment_line(from, to, self.max_segment);
        let seconds = duration_seconds(distance, feed_per_minute(state, rapid, self.rapid_rate));
        Emission::new(points, seconds)
    }

    fn circular(
        &self,
        start: &BTreeMap<char, f64>,
        end: &BTreeMap<char, f64>,
        state: &CncState,
        ctx: &ExecContext,
        clockwise: bool,
        line: i64,
    ) -> Result<Emission, NcError> {
        if matches!(state.modal(ModalGroup::Plane), Some("G18") | Some("G19")) {
            return Err(NcError::code_in(
                line,
                "circular interpolation is only supported in the XY plane (G17)",
                "",
            ));
        }

        let sx = start.get(&'X').copied().unwrap_or(0.0);
        let sy = start.get(&'Y').copied().unwrap_or(0.0);
        let ex = end.get(&'X').copied().unwrap_or(sx);
        let ey = end.get(&'Y').copied().unwrap_or(sy);

        let (cx, cy) = self.arc_center(sx, sy, ex, ey, ctx, clockwise, line)?;

        let start_angle = (sy - cy).atan2(sx - cx);
        let end_angle = (ey - cy).atan2(ex - cx);
        let mut sweep = end_angle - start_angle;
        if clockwise && sweep > 0.0 {
            sweep -= std::f64::consts::TAU;
        }
        if !clockwise && sweep < 0.0 {
            sweep += std::f64::consts::TAU;
        }

        let radius = (sx - cx).hypot(sy - cy);
        let arc_length = sweep.abs() * radius;

        let sz = start.get(&'Z').copied().unwrap_or(0.0);
        let ez = end.get(&'Z').copied().unwrap_or(sz);
        let rotary = (
            end.get(&'A').copied().unwrap_or(0.0),
            end.get(&'B').copied().unwrap_or(0.0),
            end.get(&'C').copied().unwrap_or(0.0),
        );
        let points = segment_arc(
            (cx, cy),
            radius,
            start_angle,
            sweep,
            sz,
            ez,
            rotary,
            self.max_segment,
        );
        let seconds = duration_seconds(arc_length, feed_per_minute(state, false, self.rapid_rate));
        Ok(Emission::new(points, seconds))
    }

    /// Arc center from `I`/`J` offsets, or derived from `R` by choosing
    /// between the two chord-equidistant candidates with the rotation sense.
    fn arc_center(
        &self,
        sx: f64,
        sy: f64,
        ex: f64,
        ey: f64,
        ctx: &ExecContext,
        clockwise: bool,
        line: i64,
    ) -> Result<(f64, f64), NcError> {
        if ctx.param('I').is_some() || ctx.param('J').is_some() {
            let i = match ctx.param('I') {
                Some(text) => parse_number(text, 'I', line)?,
                None => 0.0,
            };
            let j = match ctx.param('J') {
                Some(text) => parse_number(text, 'J', line)?,
                None => 0.0,
            };
            return Ok((sx + i, sy + j));
        }

        if let Some(text) = ctx.param('R') {
            let r = parse_number(text, 'R', line)?;
            if r != 0.0 {
                let mx = (sx + ex) / 2.0;
                let my = (sy + ey) / 2.0;
                let dx = ex - sx;
                let dy = ey - sy;
                let d2 = dx * dx + dy * dy;
                if d2 == 0.0 {
                    return Err(NcError::code_in(
                        line,
                        "arc with R has zero chord length",
                        "",
                    ));
                }
                let h = (r * r - d2 / 4.0).max(0.0).sqrt() / d2.sqrt();
                // Two candidate centers sit on either side of the chord.
                // R > 0 selects the minor arc, R < 0 the major arc,
                // independent of the rotation sense.
                let left = (mx - h * dy, my + h * dx);
                let right = (mx + h * dy, my - h * dx);
                let minor = r > 0.0;
                return Ok(if minor != clockwise { left } else { right });
            }
        }

        Err(NcError::code_in(
            line,
            "arc requires I/J or a non-zero R parameter",
            "",
        ))
    }
}

fn has_axis_words(ctx: &ExecContext) -> bool {
    ctx.params
        .keys()
        .any(|letter| matches!(letter, 'X' | 'Y' | 'Z' | 'A' | 'B' | 'C' | 'U' | 'V' | 'W'))
}

fn parse_number(literal: &str, letter: char, line: i64) -> Result<f64, NcError> {
    literal.trim().parse().map_err(|_| {
        NcError::code_in(
            line,
            format!("malformed value for word {letter}"),
            format!("{letter}{literal}"),
        )
    })
}

// ── interpolation primitives (shared with G28 and cycle expansion) ───────────

/// The commanded speed along the path, in length units per minute.
pub(crate) fn feed_per_minute(state: &CncState, rapid: bool, rapid_rate: Option<f64>) -> f64 {
    if rapid {
        if let Some(rate) = rapid_rate {
            return rate;
        }
    }
    let feed = state.feed_rate.unwrap_or(1.0);
    if state.feed_per_revolution() {
        feed * state.spindle_speed.unwrap_or(1.0)
    } else {
        feed
    }
}

pub(crate) fn duration_seconds(distance: f64, feed_per_min: f64) -> f64 {
    let per_second = feed_per_min / 60.0;
    if per_second > 0.0 {
        distance / per_second
    } else {
        0.0
    }
}

/// Interpolates `from → to` with chords no longer than `max_segment`.
///
/// The start point is never emitted; rotary axes take the end values.
pub(crate) fn segment_line(from: Point, to: Point, max_segment: f64) -> Vec<Point> {
    let distance = from.linear_distance(&to);
    if distance <= 0.0 {
        return vec![to];
    }
    let n = ((distance / max_segment).ceil() as usize).max(1);
    let mut points = Vec::with_capacity(n);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        points.push(Point {
            x: from.x + (to.x - from.x) * t,
            y: from.y + (to.y - from.y) * t,
            z: from.z + (to.z - from.z) * t,
            a: to.a,
            b: to.b,
            c: to.c,
        });
    }
    points
}

/// Sweeps an XY-plane arc, interpolating Z linearly along it.
#[allow(clippy::too_many_arguments)]
pub(crate) fn segment_arc(
    center: (f64, f64),
    radius: f64,
    start_angle: f64,
    sweep: f64,
    z_from: f64,
    z_to: f64,
    rotary: (f64, f64, f64),
    max_segment: f64,
) -> Vec<Point> {
    let arc_length = sweep.abs() * radius;
    let n = ((arc_length / max_segment).ceil() as usize).max(2);
    let mut points = Vec::with_capacity(n);
    for i in 1..=n {
        let t = i as f64 / n as f64;
        let theta = start_angle + sweep * t;
        points.push(Point {
            x: center.0 + theta.cos() * radius,
            y: center.1 + theta.sin() * radius,
            z: z_from + (z_to - z_from) * t,
            a: rotary.0,
            b: rotary.1,
            c: rotary.2,
        });
    }
    points
}
