//! Canned machining cycles of the Siemens-like milling dialect.
//!
//! A cycle call expands into the same primitive linear/circular emissions a
//! hand-written program would produce, using a finer segment cap than
//! ordinary motion so point counts stay proportional to geometry length.

use crate::error::NcError;
use crate::expr;
use crate::handlers::motion::{duration_seconds, feed_per_minute, segment_arc, segment_line};
use crate::handlers::{Emission, ExecContext, Flow};
use crate::node::CommandNode;
use crate::state::CncState;
use crate::toolpath::Point;

#[derive(Debug)]
pub struct CycleHandler {
    /// Segment cap for cycle expansion; finer than the motion default.
    pub max_segment: f64,
}

impl CycleHandler {
    pub fn handle(
        &self,
        node: &CommandNode,
        state: &mut CncState,
        _ctx: &mut ExecContext,
    ) -> Result<Flow, NcError> {
        let Some(statement) = node.loop_command.as_deref() else {
            return Ok(Flow::Pass);
        };
        let Some((name, args_text)) = split_call(statement) else {
            return Ok(Flow::Pass);
        };
        let line = node.diagnostic_line();

        let mut args = Vec::new();
        for piece in args_text.split(',') {
            let piece = piece.trim();
            if piece.is_empty() {
                args.push(0.0);
            } else {
                args.push(expr::eval(piece, &state.parameters, line)?);
            }
        }
        let arg = |i: usize| args.get(i).copied().unwrap_or(0.0);

        tracing::debug!(cycle = name, line, "expand cycle");
        let emission = match name {
            "POCKET4" => self.pocket4(&arg, state, line)?,
            "SLOT2" => self.slot2(&arg, state, line)?,
            "CYCLE61" => self.cycle61(&arg, state, line)?,
            "CYCLE81" => self.cycle81(&arg, state)?,
            _ => {
                return Err(NcError::code_in(
                    line,
                    format!("unsupported cycle `{name}`"),
                    statement,
                ))
            }
        };
        Ok(Flow::Done(Some(emission)))
    }

    /// `POCKET4(RTP, RFP, SDIS, DP, DPR, PRAD, CPA, CPO, …)` — circular
    /// pocket: plunge at the centre, then concentric full circles out to the
    /// pocket radius, connected by radial moves.
    fn pocket4(
        &self,
        arg: &dyn Fn(usize) -> f64,
        state: &mut CncState,
        line: i64,
    ) -> Result<Emission, NcError> {
        let (rtp, rfp, dp, dpr) = (arg(0), arg(1), arg(3), arg(4));
        let (prad, cpa, cpo) = (arg(5), arg(6), arg(7));
        if prad <= 0.0 {
            return Err(NcError::code(line, "POCKET4 requires a positive pocket radius"));
        }
        let depth = cycle_depth(dp, rfp, dpr);

        let mut path = CyclePath::begin(state, self.max_segment);
        path.line_to(Point::new(cpa, cpo, rtp));
        path.line_to(Point::new(cpa, cpo, depth));

        const PASSES: usize = 10;
        for k in 1..=PASSES {
            let radius = if k == PASSES {
                prad
            } else {
                prad * k as f64 / PASSES as f64
            };
            path.line_to(Point::new(cpa + radius, cpo, depth));
            path.full_circle((cpa, cpo), radius, depth);
        }
        path.retract_to(rtp);
        Ok(path.finish(state))
    }

    /// `SLOT2(RTP, RFP, SDIS, DP, DPR, NUM, AFSL, WID, CPA, CPO, RAD, STA1,
    /// INDA)` — `NUM` arc slots of angular length `AFSL` on the circle of
    /// radius `RAD`, starting at `STA1` with increment `INDA`.
    fn slot2(
        &self,
        arg: &dyn Fn(usize) -> f64,
        state: &mut CncState,
        line: i64,
    ) -> Result<Emission, NcError> {
        let (rtp, rfp, dp, dpr) = (arg(0), arg(1), arg(3), arg(4));
        let (num, afsl) = (arg(5), arg(6));
        let (cpa, cpo, rad, sta1, inda) = (arg(8), arg(9), arg(10), arg(11), arg(12));
        if rad <= 0.0 {
            return Err(NcError::code(line, "SLOT2 requires a positive circle radius"));
        }
        let depth = cycle_depth(dp, rfp, dpr);
        let slots = (num as usize).max(1);

        let mut path = CyclePath::begin(state, self.max_segment);
        for i in 0..slots {
            let start_angle = (sta1 + inda * i as f64).to_radians();
            let sweep = afsl.to_radians();
            let sx = cpa + rad * start_angle.cos();
            let sy = cpo + rad * start_angle.sin();
            path.line_to(Point::new(sx, sy, rtp));
            path.line_to(Point::new(sx, sy, depth));
            path.arc_to((cpa, cpo), rad, start_angle, sweep, depth);
            path.retract_to(rtp);
        }
        Ok(path.finish(state))
    }

    /// `CYCLE61(RTP, RFP, SDIS, DP, PA, PO, LENG, WID, STA, MID, MIDA, …)`
    /// — face milling of the rectangle at `(PA, PO)` with extents
    /// `LENG × WID`, as zig-zag passes at depth `DP` with stepover `MIDA`.
    fn cycle61(
        &self,
        arg: &dyn Fn(usize) -> f64,
        state: &mut CncState,
        line: i64,
    ) -> Result<Emission, NcError> {
        let (rtp, dp) = (arg(0), arg(3));
        let (pa, po, leng, wid, mida) = (arg(4), arg(5), arg(6), arg(7), arg(10));
        if leng <= 0.0 || wid <= 0.0 {
            return Err(NcError::code(line, "CYCLE61 requires positive extents"));
        }
        let stepover = if mida > 0.0 && mida <= wid {
            mida
        } else {
            wid / 10.0
        };

        let mut path = CyclePath::begin(state, self.max_segment);
        path.line_to(Point::new(pa, po, rtp));
        path.line_to(Point::new(pa, po, dp));

        let rows = (wid / stepover).ceil() as usize;
        let mut left_to_right = true;
        for row in 0..=rows {
            let y = (po + row as f64 * stepover).min(po + wid);
            let (from_x, to_x) = if left_to_right {
                (pa, pa + leng)
            } else {
                (pa + leng, pa)
            };
            path.line_to(Point::new(from_x, y, dp));
            path.line_to(Point::new(to_x, y, dp));
            left_to_right = !left_to_right;
        }
        path.retract_to(rtp);
        Ok(path.finish(state))
    }

    /// `CYCLE81(RTP, RFP, SDIS, DFA, DPR)` — drill at the current position:
    /// plunge to the final depth, retract to the retraction plane.
    fn cycle81(&self, arg: &dyn Fn(usize) -> f64, state: &mut CncState) -> Result<Emission, NcError> {
        let (rtp, rfp, dfa, dpr) = (arg(0), arg(1), arg(3), arg(4));
        let depth = cycle_depth(dfa, rfp, dpr);

        let mut path = CyclePath::begin(state, self.max_segment);
        let (x, y) = (path.position.x, path.position.y);
        path.line_to(Point::new(x, y, rtp));
        path.line_to(Point::new(x, y, depth));
        path.retract_to(rtp);
        Ok(path.finish(state))
    }
}

/// Final machining depth: the absolute `DP` when programmed, else the
/// reference plane minus the relative depth.
fn cycle_depth(dp: f64, rfp: f64, dpr: f64) -> f64 {
    if dp != 0.0 {
        dp
    } else {
        rfp - dpr
    }
}

/// `NAME(args)` → `("NAME", "args")`.
fn split_call(statement: &str) -> Option<(&str, &str)> {
    let open = statement.find('(')?;
    let close = statement.rfind(')')?;
    if close < open {
        return None;
    }
    let name = statement[..open].trim();
    if name.is_empty() || !name.bytes().all(|b| b.is_ascii_alphanumeric() || b == b'_') {
        return None;
    }
    Some((name, &statement[open + 1..close]))
}

/// Accumulates an expansion: points, travelled length and the running
/// position, so each cycle reads as a sequence of `line_to`/`arc_to` calls.
struct CyclePath {
    points: Vec<Point>,
    travelled: f64,
    position: Point,
    max_segment: f64,
    feed_per_min: f64,
}

impl CyclePath {
    fn begin(state: &CncState, max_segment: f64) -> Self {
        CyclePath {
            points: Vec::new(),
            travelled: 0.0,
            position: Point::from_axes(&state.axes),
            max_segment,
            feed_per_min: feed_per_minute(state, false, None),
        }
    }

    fn line_to(&mut self, to: Point) {
        let distance = self.position.linear_distance(&to);
        if distance <= 0.0 {
            return;
        }
        self.travelled += distance;
        self.points
            .extend(segment_line(self.position, to, self.max_segment));
        self.position = to;
    }

    fn arc_to(&mut self, center: (f64, f64), radius: f64, start_angle: f64, sweep: f64, z: f64) {
        self.points.extend(segment_arc(
            center,
            radius,
            start_angle,
            sweep,
            z,
            z,
            (0.0, 0.0, 0.0),
            self.max_segment,
        ));
        self.travelled += sweep.abs() * radius;
        let end_angle = start_angle + sweep;
        self.position = Point::new(
            center.0 + end_angle.cos() * radius,
            center.1 + end_angle.sin() * radius,
            z,
        );
    }

    fn full_circle(&mut self, center: (f64, f64), radius: f64, z: f64) {
        let start_angle = (self.position.y - center.1).atan2(self.position.x - center.0);
        self.arc_to(center, radius, start_angle, std::f64::consts::TAU, z);
    }

    fn retract_to(&mut self, z: f64) {
        let up = Point::new(self.position.x, self.position.y, z);
        self.line_to(up);
    }

    fn finish(self, state: &mut CncState) -> Emission {
        state.set_axis('X', self.position.x);
        state.set_axis('Y', self.position.y);
        state.set_axis('Z', self.position.z);
        Emission::new(
            self.points,
            duration_seconds(self.travelled, self.feed_per_min),
        )
    }
}
