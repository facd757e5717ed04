/*
 *  face.rs
 *
 *  vumeter - worth the squeeze
 *	(c) 2020-26 Stuart Hunter
 *
 *	Meter face layout: gradient, bezel, ruler and needle
 *
 *	This program is free software: you can redistribute it and/or modify
 *	it under the terms of the GNU General Public License as published by
 *	the Free Software Foundation, either version 3 of the License, or
 *	(at your option) any later version.
 *
 *	This program is distributed in the hope that it will be useful,
 *	but WITHOUT ANY WARRANTY; without even the implied warranty of
 *	MERCHANTABILITY or FITNESS FOR A PARTICULAR PURPOSE.  See the
 *	GNU General Public License for more details.
 *
 *	See <http://www.gnu.org/licenses/> to get a copy of the GNU General
 *	Public License.
 *
 */

//! All face geometry is in fractions of one channel's half-width `w`, using
//! integer division exactly as written, so a given width always lays out to
//! the same pixels.

use core::f64::consts::PI;
use embedded_graphics::{
    geometry::{Point, Size},
    pixelcolor::Rgb888,
    prelude::*,
    primitives::Rectangle,
};

use crate::draw::{draw_gradient, draw_line, draw_rect, fill_rect};
use crate::framebuf::FrameBuffer;

/// Ruler segments: one foreground, five scale, one peak.
pub const RULER_SEGMENTS: i32 = 7;
/// Sub-ticks are only drawn when a segment is at least this wide.
pub const MIN_SUBTICK_SEGMENT: i32 = 12;

/// The four colours of a meter face.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct MeterColours {
    pub gradient_top: Rgb888,
    pub gradient_bottom: Rgb888,
    /// Bezel, scale and needles.
    pub foreground: Rgb888,
    /// Last ruler segment.
    pub peak: Rgb888,
}

impl Default for MeterColours {
    fn default() -> Self {
        Self {
            gradient_top: Rgb888::new(0x80, 0x66, 0x33),
            gradient_bottom: Rgb888::new(0xFF, 0xCC, 0x66),
            foreground: Rgb888::new(0x00, 0x00, 0x00),
            peak: Rgb888::new(0xAA, 0x00, 0x00),
        }
    }
}

/// Needle angle in radians, −45° at rest to +45° at full scale.
#[inline]
pub fn needle_angle(deflection: f64) -> f64 {
    deflection * PI / 2.0 - PI / 4.0
}

/// Needle from its tip on the scale arc down to where it meets the bezel.
pub fn needle_line(w: i32, deflection: f64) -> (Point, Point) {
    let angle = needle_angle(deflection);
    let r_tip = (w * 8 / 16) as f64;
    let x1 = ((w / 2) as f64 + r_tip * angle.sin()) as i32;
    let y1 = ((w * 9 / 16) as f64 - r_tip * angle.cos()) as i32;
    let x2 = ((w / 2) as f64 + (w * 3 / 16) as f64 * angle.tan()) as i32;
    let y2 = w * 3 / 8;
    (Point::new(x1, y1), Point::new(x2, y2))
}

pub fn bezel_rect(w: i32) -> Rectangle {
    Rectangle::new(
        Point::new(w * 5 / 16, w * 3 / 8),
        Size::new((w * 6 / 16) as u32, (w / 16) as u32),
    )
}

/// Ruler geometry for a half-width `w`.
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Ruler {
    pub origin: Point,
    pub segment: i32,
    pub height: i32,
}

impl Ruler {
    pub fn for_width(w: i32) -> Self {
        Self {
            origin: Point::new(w / 16, w / 8),
            segment: (w * 14 / 16) / RULER_SEGMENTS,
            height: w / 16,
        }
    }

    pub fn segment_rect(&self, idx: i32) -> Rectangle {
        Rectangle::new(
            self.origin + Point::new(self.segment * idx, 0),
            Size::new(self.segment.max(0) as u32, self.height.max(0) as u32),
        )
    }

    /// Left edge x of each scale segment (1 to 5).
    fn scale_starts(&self) -> impl Iterator<Item = i32> + '_ {
        (1..RULER_SEGMENTS - 1).map(move |i| self.origin.x + self.segment * i)
    }

    /// Top edge of every scale segment.
    pub fn edges(&self) -> Vec<(Point, Point)> {
        let y = self.origin.y;
        self.scale_starts()
            .map(|n| (Point::new(n, y), Point::new(n + self.segment, y)))
            .collect()
    }

    /// Full height mark at the start of every scale segment.
    pub fn big_ticks(&self) -> Vec<(Point, Point)> {
        let y = self.origin.y;
        self.scale_starts()
            .map(|n| (Point::new(n, y), Point::new(n, y + self.height - 1)))
            .collect()
    }

    /// Five half height marks inside every scale segment; none when segments
    /// are too narrow to tell them apart.
    pub fn small_ticks(&self) -> Vec<(Point, Point)> {
        if self.segment < MIN_SUBTICK_SEGMENT {
            return Vec::new();
        }
        let y = self.origin.y;
        let mut ticks = Vec::with_capacity(25);
        for n in self.scale_starts() {
            for v in 1..6 {
                let x = n + self.segment * v / 6;
                ticks.push((Point::new(x, y), Point::new(x, y + self.height / 2)));
            }
        }
        ticks
    }
}

pub fn draw_ruler<D>(target: &mut D, w: i32, colours: &MeterColours) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let ruler = Ruler::for_width(w);
    fill_rect(target, ruler.segment_rect(0), colours.foreground)?;
    let lines = ruler.edges().into_iter()
        .chain(ruler.big_ticks())
        .chain(ruler.small_ticks());
    for (a, b) in lines {
        draw_line(target, a, b, colours.foreground)?;
    }
    fill_rect(target, ruler.segment_rect(RULER_SEGMENTS - 1), colours.peak)
}

/// Static part of one channel's face: gradient, bezel and ruler.
pub fn draw_face<D>(target: &mut D, w: i32, colours: &MeterColours) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    draw_gradient(target, colours.gradient_top, colours.gradient_bottom, w as u32, (w / 2) as u32)?;
    draw_rect(target, bezel_rect(w), colours.foreground)?;
    draw_ruler(target, w, colours)
}

pub fn draw_needle<D>(target: &mut D, w: i32, colour: Rgb888, deflection: f64) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    let (tip, base) = needle_line(w, deflection);
    draw_line(target, tip, base, colour)
}

/// Both channel faces with the static artwork rendered once.
///
/// Each frame blits the cached face into the left and right halves and draws
/// the two needles over them.
#[derive(Debug, Clone)]
pub struct MeterFace {
    half_width: i32,
    colours: MeterColours,
    face: FrameBuffer<Rgb888>,
}

impl MeterFace {
    /// `width` is the full stereo width; each channel gets half.
    pub fn new(width: u32, colours: MeterColours) -> Self {
        let w = (width / 2) as i32;
        let mut face = FrameBuffer::new(w as u32, (w / 2) as u32, colours.gradient_bottom);
        if let Err(e) = draw_face(&mut face, w, &colours) {
            match e {}
        }
        Self { half_width: w, colours, face }
    }

    pub fn half_width(&self) -> i32 {
        self.half_width
    }

    /// Full frame size: width × width/4.
    pub fn frame_size(&self) -> Size {
        Size::new((self.half_width * 2) as u32, (self.half_width / 2) as u32)
    }

    pub fn colours(&self) -> &MeterColours {
        &self.colours
    }

    pub fn render<D>(&self, target: &mut D, left: f64, right: f64) -> Result<(), D::Error>
    where
        D: DrawTarget<Color = Rgb888>,
    {
        let w = self.half_width;
        self.face.blit(target, Point::zero())?;
        self.face.blit(target, Point::new(w, 0))?;
        draw_needle(target, w, self.colours.foreground, left)?;
        draw_needle(&mut target.translated(Point::new(w, 0)), w, self.colours.foreground, right)
    }
}
