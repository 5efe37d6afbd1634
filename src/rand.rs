use nannou::geom::Rect;
use nannou::geom::Vec2;
use nannou::rand::prelude::*;

/// Returns a random point in the [rect], uniform over `[left, right) x [bottom, top)`.
pub fn random_point_in_rect(rand: &mut SmallRng, rect: Rect) -> Vec2 {
    Vec2::new(rect.x.lerp(rand.gen()), rect.y.lerp(rand.gen()))
}

/// Returns a random value in `[0, amount)`, or 0 when [amount] is not positive.
pub fn random_jitter(rand: &mut SmallRng, amount: f32) -> f32 {
    if amount > 0.0 {
        rand.gen::<f32>() * amount
    } else {
        0.0
    }
}
