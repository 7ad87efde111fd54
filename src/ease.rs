/// Easing functions used to map normalized animation progress.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Default, serde::Serialize, serde::Deserialize)]
pub enum Ease {
    /// Linear interpolation.
    #[default]
    Linear,
    /// Quadratic ease-in.
    InQuad,
    /// Quadratic ease-out.
    OutQuad,
    /// Quadratic ease-in/out.
    InOutQuad,
    /// Cubic ease-in.
    InCubic,
    /// Cubic ease-out.
    OutCubic,
    /// Cubic ease-in/out.
    InOutCubic,
    /// Quartic ease-in.
    InQuart,
    /// Quartic ease-out.
    OutQuart,
    /// Quartic ease-in/out.
    InOutQuart,
    /// Quintic ease-out.
    OutQuint,
    /// Sine ease-out.
    OutSine,
    /// Sine ease-in/out.
    InOutSine,
    /// Exponential ease-out.
    OutExpo,
}

impl Ease {
    /// Apply this easing function to normalized progress `t` in `[0, 1]`.
    pub fn apply(self, t: f64) -> f64 {
        let t = t.clamp(0.0, 1.0);
        match self {
            Self::Linear => t,
            Self::InQuad => t * t,
            Self::OutQuad => 1.0 - (1.0 - t) * (1.0 - t),
            Self::InOutQuad => {
                if t < 0.5 {
                    2.0 * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(2) / 2.0)
                }
            }
            Self::InCubic => t * t * t,
            Self::OutCubic => 1.0 - (1.0 - t).powi(3),
            Self::InOutCubic => {
                if t < 0.5 {
                    4.0 * t * t * t
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(3) / 2.0)
                }
            }
            Self::InQuart => t.powi(4),
            Self::OutQuart => 1.0 - (1.0 - t).powi(4),
            Self::InOutQuart => {
                if t < 0.5 {
                    8.0 * t.powi(4)
                } else {
                    1.0 - ((-2.0 * t + 2.0).powi(4) / 2.0)
                }
            }
            Self::OutQuint => 1.0 - (1.0 - t).powi(5),
            Self::OutSine => (t * std::f64::consts::FRAC_PI_2).sin(),
            Self::InOutSine => -((std::f64::consts::PI * t).cos() - 1.0) / 2.0,
            Self::OutExpo => {
                if t >= 1.0 {
                    1.0
                } else {
                    1.0 - 2f64.powf(-10.0 * t)
                }
            }
        }
    }

    /// Parse an easing name as authored in markup.
    ///
    /// Accepts the `powerN.in|out|inOut` family, `sine.*`, `expo.out`,
    /// `none`/`linear`, and the variant names themselves (case-insensitive).
    /// Returns `None` for anything else so callers can keep their default.
    pub fn from_name(name: &str) -> Option<Self> {
        let n = name.trim().to_ascii_lowercase();
        let ease = match n.as_str() {
            "none" | "linear" => Self::Linear,
            "power1.in" | "quad.in" | "inquad" => Self::InQuad,
            "power1.out" | "power1" | "quad.out" | "outquad" => Self::OutQuad,
            "power1.inout" | "quad.inout" | "inoutquad" => Self::InOutQuad,
            "power2.in" | "cubic.in" | "incubic" => Self::InCubic,
            "power2.out" | "power2" | "cubic.out" | "outcubic" => Self::OutCubic,
            "power2.inout" | "cubic.inout" | "inoutcubic" => Self::InOutCubic,
            "power3.in" | "quart.in" | "inquart" => Self::InQuart,
            "power3.out" | "power3" | "quart.out" | "outquart" => Self::OutQuart,
            "power3.inout" | "quart.inout" | "inoutquart" => Self::InOutQuart,
            "power4.out" | "power4" | "quint.out" | "outquint" => Self::OutQuint,
            "sine.out" | "sine" | "outsine" => Self::OutSine,
            "sine.inout" | "inoutsine" => Self::InOutSine,
            "expo.out" | "expo" | "outexpo" => Self::OutExpo,
            _ => return None,
        };
        Some(ease)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const ALL: [Ease; 14] = [
        Ease::Linear,
        Ease::InQuad,
        Ease::OutQuad,
        Ease::InOutQuad,
        Ease::InCubic,
        Ease::OutCubic,
        Ease::InOutCubic,
        Ease::InQuart,
        Ease::OutQuart,
        Ease::InOutQuart,
        Ease::OutQuint,
        Ease::OutSine,
        Ease::InOutSine,
        Ease::OutExpo,
    ];

    #[test]
    fn endpoints_are_stable() {
        for ease in ALL {
            assert!(ease.apply(0.0).abs() < 1e-12, "{ease:?}");
            assert!((ease.apply(1.0) - 1.0).abs() < 1e-12, "{ease:?}");
        }
    }

    #[test]
    fn monotonic_spot_check() {
        for ease in ALL {
            let a = ease.apply(0.25);
            let b = ease.apply(0.5);
            let c = ease.apply(0.75);
            assert!(a < b, "{ease:?}");
            assert!(b < c, "{ease:?}");
        }
    }

    #[test]
    fn out_cubic_matches_closed_form() {
        let t = 0.4;
        assert!((Ease::OutCubic.apply(t) - (1.0 - (1.0 - t).powi(3))).abs() < 1e-12);
    }

    #[test]
    fn names_parse_with_fallback() {
        assert_eq!(Ease::from_name("none"), Some(Ease::Linear));
        assert_eq!(Ease::from_name("power3.inOut"), Some(Ease::InOutQuart));
        assert_eq!(Ease::from_name(" Power2.Out "), Some(Ease::OutCubic));
        assert_eq!(Ease::from_name("elastic.out(1, 0.3)"), None);
    }
}
