//! Connector geometry for highlighted refutation edges.

use crate::highlight::Highlight;
use crate::layout::{Point, PositionMap, Rect};
use crate::model::LinkKind;

/// Smallest horizontal reach of a curve's control points.
const MIN_BEND: f64 = 40.0;

/// Which end of a connector carries the arrow head.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub enum ArrowHead {
    Start,
    End,
}

/// A cubic curve between two highlighted entities.
#[derive(Debug, Clone, PartialEq)]
pub struct Connector {
    pub source: String,
    pub target: String,
    pub kind: LinkKind,
    pub start: Point,
    pub control1: Point,
    pub control2: Point,
    pub end: Point,
    /// Arrows always point from the rebutting argument to what it rebuts.
    pub arrow: ArrowHead,
}

impl Connector {
    /// SVG path data for the curve.
    pub fn svg_path(&self) -> String {
        format!(
            "M {:.1} {:.1} C {:.1} {:.1}, {:.1} {:.1}, {:.1} {:.1}",
            self.start.x,
            self.start.y,
            self.control1.x,
            self.control1.y,
            self.control2.x,
            self.control2.y,
            self.end.x,
            self.end.y
        )
    }
}

/// Build one connector per highlighted edge whose endpoints are both laid out.
pub fn connectors(highlight: &Highlight, positions: &PositionMap) -> Vec<Connector> {
    highlight
        .edges()
        .filter_map(|edge| {
            let from = positions.get(&edge.source)?;
            let to = positions.get(&edge.target)?;
            let (start, control1, control2, end) = curve_between(from, to);
            Some(Connector {
                source: edge.source.clone(),
                target: edge.target.clone(),
                kind: edge.kind,
                start,
                control1,
                control2,
                end,
                arrow: match edge.kind {
                    LinkKind::RefutedBy => ArrowHead::Start,
                    LinkKind::Refutes | LinkKind::RefutesSpeaker => ArrowHead::End,
                },
            })
        })
        .collect()
}

fn curve_between(from: &Rect, to: &Rect) -> (Point, Point, Point, Point) {
    let same_column = from.left() < to.right() && to.left() < from.right();

    if same_column {
        // Loop out to the right so the curve doesn't cross the column.
        let start = from.right_middle();
        let end = to.right_middle();
        let reach = MIN_BEND.max((end.y - start.y).abs() / 4.0);
        let x = start.x.max(end.x) + reach;
        return (
            start,
            Point { x, y: start.y },
            Point { x, y: end.y },
            end,
        );
    }

    let forward = to.center().x > from.center().x;
    let (start, end) = if forward {
        (from.right_middle(), to.left_middle())
    } else {
        (from.left_middle(), to.right_middle())
    };
    let direction = if forward { 1.0 } else { -1.0 };
    let bend = ((end.x - start.x).abs() / 2.0).max(MIN_BEND);

    (
        start,
        Point {
            x: start.x + direction * bend,
            y: start.y,
        },
        Point {
            x: end.x - direction * bend,
            y: end.y,
        },
        end,
    )
}
