use rand::seq::SliceRandom;
use rand::Rng;

const CONFETTI: [&str; 6] = ["✨", "🎉", "⭐", "🎊", "🌟", "🎈"];
const ARRIVAL_TEXT: &str = "とうちゃく！";
const DURATION_MS: i64 = 3_000;
/// Fixed animation step, matching the UI tick
const STEP_SECS: f64 = 0.1;

#[derive(Debug, Clone)]
pub struct Particle {
    pub x: f64,
    pub y: f64,
    pub vel_x: f64,
    pub vel_y: f64,
    pub symbol: String,
    pub color_index: usize,
    pub age: f64,
    pub max_age: f64,
    /// Letters of the arrival text glide to a slot and stay there
    pub target: Option<(f64, f64)>,
}

impl Particle {
    fn confetti<R: Rng + ?Sized>(x: f64, y: f64, rng: &mut R) -> Self {
        Self {
            x,
            y,
            vel_x: rng.gen_range(-3.0..3.0),
            vel_y: rng.gen_range(-4.0..-1.0),
            symbol: CONFETTI.choose(rng).unwrap_or(&"✨").to_string(),
            color_index: rng.gen_range(0..7),
            age: 0.0,
            max_age: rng.gen_range(2.0..4.0),
            target: None,
        }
    }

    fn letter(from: (f64, f64), to: (f64, f64), symbol: char, color_index: usize) -> Self {
        Self {
            x: from.0,
            y: from.1,
            vel_x: to.0 - from.0,
            vel_y: to.1 - from.1,
            symbol: symbol.to_string(),
            color_index,
            age: 0.0,
            max_age: DURATION_MS as f64 / 1000.0 + 1.0,
            target: Some(to),
        }
    }

    fn update(&mut self, dt: f64) -> bool {
        match self.target {
            Some((tx, ty)) => {
                let dist = ((tx - self.x).powi(2) + (ty - self.y).powi(2)).sqrt();
                if dist > 1.0 {
                    self.x += self.vel_x * dt;
                    self.y += self.vel_y * dt;
                    self.vel_x *= 0.95;
                    self.vel_y *= 0.95;
                } else {
                    self.x = tx;
                    self.y = ty;
                }
            }
            None => {
                self.x += self.vel_x * dt;
                self.y += self.vel_y * dt;
                self.vel_y += 15.0 * dt;
            }
        }
        self.age += dt;
        self.age < self.max_age
    }
}

/// Confetti burst shown when the car reaches its destination
#[derive(Debug, Default)]
pub struct ArrivalCelebration {
    pub particles: Vec<Particle>,
    started_at_ms: i64,
    pub is_active: bool,
    width: f64,
    height: f64,
}

impl ArrivalCelebration {
    pub fn new() -> Self {
        Self::default()
    }

    pub fn start(&mut self, width: u16, height: u16, now_ms: i64) {
        self.start_with_rng(width, height, now_ms, &mut rand::thread_rng());
    }

    pub fn start_with_rng<R: Rng + ?Sized>(
        &mut self,
        width: u16,
        height: u16,
        now_ms: i64,
        rng: &mut R,
    ) {
        self.particles.clear();
        self.started_at_ms = now_ms;
        self.is_active = true;
        self.width = width as f64;
        self.height = height as f64;

        let cx = self.width / 2.0;
        let cy = self.height / 2.0;

        // kana are two columns wide
        let letters = ARRIVAL_TEXT.chars().count() as f64;
        let left = cx - letters;
        for (i, ch) in ARRIVAL_TEXT.chars().enumerate() {
            let to = (left + i as f64 * 2.0, cy - 2.0);
            let from = (cx + rng.gen_range(-10.0..10.0), cy + rng.gen_range(-5.0..5.0));
            self.particles
                .push(Particle::letter(from, to, ch, rng.gen_range(0..7)));
        }

        for _ in 0..25 {
            let x = cx + rng.gen_range(-15.0..15.0);
            let y = cy + rng.gen_range(-8.0..8.0);
            self.particles.push(Particle::confetti(x, y, rng));
        }
    }

    pub fn update(&mut self, now_ms: i64) {
        if !self.is_active {
            return;
        }
        if now_ms - self.started_at_ms >= DURATION_MS {
            self.is_active = false;
            self.particles.clear();
            return;
        }

        let (w, h) = (self.width, self.height);
        self.particles.retain_mut(|p| {
            let alive = p.update(STEP_SECS);
            let off_screen = p.target.is_none() && (p.y > h + 5.0 || p.x < -5.0 || p.x > w + 5.0);
            alive && !off_screen
        });
    }

    pub fn stop(&mut self) {
        self.is_active = false;
        self.particles.clear();
    }
}

#[cfg(test)]
mod tests {
    use super::*;
    use rand::rngs::StdRng;
    use rand::SeedableRng;

    fn started(width: u16, height: u16) -> ArrivalCelebration {
        let mut c = ArrivalCelebration::new();
        c.start_with_rng(width, height, 0, &mut StdRng::seed_from_u64(3));
        c
    }

    #[test]
    fn inactive_until_started() {
        let c = ArrivalCelebration::new();
        assert!(!c.is_active);
        assert!(c.particles.is_empty());
    }

    #[test]
    fn spells_the_arrival_text() {
        let c = started(80, 24);
        let letters: String = c
            .particles
            .iter()
            .filter(|p| p.target.is_some())
            .map(|p| p.symbol.as_str())
            .collect();
        assert_eq!(letters, ARRIVAL_TEXT);
        assert!(c.particles.iter().any(|p| p.target.is_none()));
    }

    #[test]
    fn confetti_falls() {
        let mut p = Particle::confetti(10.0, 10.0, &mut StdRng::seed_from_u64(1));
        let vel_y = p.vel_y;
        assert!(p.update(0.1));
        assert!(p.vel_y > vel_y);
    }

    #[test]
    fn letters_settle_on_target() {
        let mut p = Particle::letter((0.0, 0.0), (10.0, 5.0), 'と', 0);
        for _ in 0..40 {
            p.update(0.1);
        }
        let dist = ((10.0 - p.x).powi(2) + (5.0 - p.y).powi(2)).sqrt();
        assert!(dist <= 5.0);
    }

    #[test]
    fn ends_after_three_seconds() {
        let mut c = started(80, 24);
        c.update(1_000);
        assert!(c.is_active);
        c.update(3_000);
        assert!(!c.is_active);
        assert!(c.particles.is_empty());
    }

    #[test]
    fn off_screen_confetti_is_dropped() {
        let mut c = started(20, 10);
        c.particles
            .push(Particle::confetti(100.0, 100.0, &mut StdRng::seed_from_u64(2)));
        c.update(100);
        for p in c.particles.iter().filter(|p| p.target.is_none()) {
            assert!(p.y <= 15.0 && p.x >= -5.0 && p.x <= 25.0);
        }
    }
}
