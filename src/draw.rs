use embedded_graphics::{
    pixelcolor::Rgb888,
    prelude::*,
    primitives::{Line, PrimitiveStyle, Rectangle},
};

pub fn draw_line<D>(target: &mut D, start: Point, end: Point, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    Line::new(start, end)
        .into_styled(PrimitiveStyle::with_stroke(color, 1))
        .draw(target)
}

pub fn fill_rect<D>(target: &mut D, rect: Rectangle, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    rect.into_styled(PrimitiveStyle::with_fill(color)).draw(target)
}

/// One pixel outline, drawn inside `rect`.
pub fn draw_rect<D>(target: &mut D, rect: Rectangle, color: Rgb888) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    rect.into_styled(PrimitiveStyle::with_stroke(color, 1)).draw(target)
}

/// Vertical blend from `top` to `bottom` as one-pixel horizontal strips.
pub fn draw_gradient<D>(
    target: &mut D,
    top: Rgb888,
    bottom: Rgb888,
    width: u32,
    height: u32,
) -> Result<(), D::Error>
where
    D: DrawTarget<Color = Rgb888>,
{
    for y in 0..height as i32 {
        let strip = Rectangle::new(Point::new(0, y), Size::new(width, 1));
        fill_rect(target, strip, gradient_row(top, bottom, y, height as i32))?;
    }
    Ok(())
}

/// Colour of row `y` of a `height` row gradient, integer blend per channel.
#[inline]
pub fn gradient_row(top: Rgb888, bottom: Rgb888, y: i32, height: i32) -> Rgb888 {
    let mix = |a: u8, b: u8| (a as i32 + (b as i32 - a as i32) * y / height) as u8;
    Rgb888::new(
        mix(top.r(), bottom.r()),
        mix(top.g(), bottom.g()),
        mix(top.b(), bottom.b()),
    )
}
