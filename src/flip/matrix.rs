//! 2D affine transform math for FLIP.
//!
//! Matrices follow the CSS `matrix(a, b, c, d, e, f)` layout, mapping
//! `(x, y)` to `(a·x + c·y + e, b·x + d·y + f)`. Elements are expected to use
//! `transform-origin: 0 0`, so translate and scale compose without an origin
//! offset.

use std::fmt;

use thiserror::Error;

use super::rect::Rect;

/// Errors parsing a CSS transform string.
#[derive(Error, Debug, Clone, PartialEq)]
pub enum TransformParseError {
    #[error("Unsupported transform function '{0}'")]
    UnsupportedFunction(String),

    #[error("Malformed transform '{0}'")]
    Malformed(String),

    #[error("Transform function '{name}' expects {expected} arguments, got {found}")]
    ArgumentCount {
        name: String,
        expected: &'static str,
        found: usize,
    },
}

/// CSS 2D affine matrix.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct Matrix2d {
    pub a: f64,
    pub b: f64,
    pub c: f64,
    pub d: f64,
    pub e: f64,
    pub f: f64,
}

impl Matrix2d {
    pub const IDENTITY: Matrix2d = Matrix2d {
        a: 1.0,
        b: 0.0,
        c: 0.0,
        d: 1.0,
        e: 0.0,
        f: 0.0,
    };

    pub fn new(a: f64, b: f64, c: f64, d: f64, e: f64, f: f64) -> Self {
        Self { a, b, c, d, e, f }
    }

    pub fn translate(x: f64, y: f64) -> Self {
        Self::new(1.0, 0.0, 0.0, 1.0, x, y)
    }

    pub fn scale(x: f64, y: f64) -> Self {
        Self::new(x, 0.0, 0.0, y, 0.0, 0.0)
    }

    /// Matrix product `self · other`: `other` applies first.
    pub fn multiply(&self, other: &Matrix2d) -> Matrix2d {
        Matrix2d {
            a: self.a * other.a + self.c * other.b,
            b: self.b * other.a + self.d * other.b,
            c: self.a * other.c + self.c * other.d,
            d: self.b * other.c + self.d * other.d,
            e: self.a * other.e + self.c * other.f + self.e,
            f: self.b * other.e + self.d * other.f + self.f,
        }
    }

    /// Left-to-right product of `matrices`.
    pub fn product<'a>(matrices: impl IntoIterator<Item = &'a Matrix2d>) -> Matrix2d {
        matrices
            .into_iter()
            .fold(Matrix2d::IDENTITY, |acc, m| acc.multiply(m))
    }

    pub fn apply(&self, x: f64, y: f64) -> (f64, f64) {
        (
            self.a * x + self.c * y + self.e,
            self.b * x + self.d * y + self.f,
        )
    }

    /// Bounding box of `rect` after this transform.
    pub fn transform_rect(&self, rect: &Rect) -> Rect {
        let corners = [
            self.apply(rect.left, rect.top),
            self.apply(rect.right(), rect.top),
            self.apply(rect.left, rect.bottom()),
            self.apply(rect.right(), rect.bottom()),
        ];
        let min_x = corners.iter().map(|p| p.0).fold(f64::INFINITY, f64::min);
        let max_x = corners.iter().map(|p| p.0).fold(f64::NEG_INFINITY, f64::max);
        let min_y = corners.iter().map(|p| p.1).fold(f64::INFINITY, f64::min);
        let max_y = corners.iter().map(|p| p.1).fold(f64::NEG_INFINITY, f64::max);
        Rect::new(min_x, min_y, max_x - min_x, max_y - min_y)
    }

    pub fn is_identity(&self) -> bool {
        *self == Self::IDENTITY
    }

    /// Parse a CSS `transform` value.
    ///
    /// Accepts `none`, the empty string, and any sequence of `matrix`,
    /// `matrix3d`, `translate`, `translateX/Y`, `translate3d`, `scale`,
    /// `scaleX/Y` and `scale3d`. Lengths may carry a `px` suffix.
    pub fn parse(css: &str) -> Result<Matrix2d, TransformParseError> {
        let css = css.trim();
        if css.is_empty() || css == "none" {
            return Ok(Matrix2d::IDENTITY);
        }

        let mut result = Matrix2d::IDENTITY;
        let mut rest = css;
        while !rest.is_empty() {
            let open = rest
                .find('(')
                .ok_or_else(|| TransformParseError::Malformed(css.to_string()))?;
            let close = rest[open..]
                .find(')')
                .map(|offset| open + offset)
                .ok_or_else(|| TransformParseError::Malformed(css.to_string()))?;

            let name = rest[..open].trim();
            let args = parse_args(&rest[open + 1..close])
                .ok_or_else(|| TransformParseError::Malformed(css.to_string()))?;
            result = result.multiply(&function_matrix(name, &args)?);
            rest = rest[close + 1..].trim_start();
        }
        Ok(result)
    }
}

impl Default for Matrix2d {
    fn default() -> Self {
        Self::IDENTITY
    }
}

impl fmt::Display for Matrix2d {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(
            f,
            "matrix({}, {}, {}, {}, {}, {})",
            self.a, self.b, self.c, self.d, self.e, self.f
        )
    }
}

fn parse_args(raw: &str) -> Option<Vec<f64>> {
    raw.split(|c: char| c == ',' || c.is_whitespace())
        .filter(|token| !token.is_empty())
        .map(|token| token.trim_end_matches("px").parse::<f64>().ok())
        .collect()
}

fn function_matrix(name: &str, args: &[f64]) -> Result<Matrix2d, TransformParseError> {
    let arity = |expected: &'static str| TransformParseError::ArgumentCount {
        name: name.to_string(),
        expected,
        found: args.len(),
    };

    match name {
        "matrix" => match args {
            [a, b, c, d, e, f] => Ok(Matrix2d::new(*a, *b, *c, *d, *e, *f)),
            _ => Err(arity("6")),
        },
        "matrix3d" => {
            if args.len() != 16 {
                return Err(arity("16"));
            }
            Ok(Matrix2d::new(
                args[0], args[1], args[4], args[5], args[12], args[13],
            ))
        }
        "translate" => match args {
            [x] => Ok(Matrix2d::translate(*x, 0.0)),
            [x, y] => Ok(Matrix2d::translate(*x, *y)),
            _ => Err(arity("1 or 2")),
        },
        "translate3d" => match args {
            [x, y, _z] => Ok(Matrix2d::translate(*x, *y)),
            _ => Err(arity("3")),
        },
        "translateX" => match args {
            [x] => Ok(Matrix2d::translate(*x, 0.0)),
            _ => Err(arity("1")),
        },
        "translateY" => match args {
            [y] => Ok(Matrix2d::translate(0.0, *y)),
            _ => Err(arity("1")),
        },
        "scale" => match args {
            [s] => Ok(Matrix2d::scale(*s, *s)),
            [x, y] => Ok(Matrix2d::scale(*x, *y)),
            _ => Err(arity("1 or 2")),
        },
        "scale3d" => match args {
            [x, y, _z] => Ok(Matrix2d::scale(*x, *y)),
            _ => Err(arity("3")),
        },
        "scaleX" => match args {
            [x] => Ok(Matrix2d::scale(*x, 1.0)),
            _ => Err(arity("1")),
        },
        "scaleY" => match args {
            [y] => Ok(Matrix2d::scale(1.0, *y)),
            _ => Err(arity("1")),
        },
        other => Err(TransformParseError::UnsupportedFunction(other.to_string())),
    }
}

/// Starting offset of a FLIP animation, relative to the element's new layout.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct FlipDiff {
    pub x: f64,
    pub y: f64,
    pub scale_x: f64,
    pub scale_y: f64,
}

impl FlipDiff {
    pub const IDENTITY: FlipDiff = FlipDiff {
        x: 0.0,
        y: 0.0,
        scale_x: 1.0,
        scale_y: 1.0,
    };

    pub fn new(x: f64, y: f64, scale_x: f64, scale_y: f64) -> Self {
        Self {
            x,
            y,
            scale_x,
            scale_y,
        }
    }

    /// Read translate and scale out of an unrotated matrix.
    pub fn from_matrix(matrix: &Matrix2d) -> Self {
        Self::new(matrix.e, matrix.f, matrix.a, matrix.d)
    }

    pub fn to_matrix(&self) -> Matrix2d {
        Matrix2d::translate(self.x, self.y).multiply(&Matrix2d::scale(self.scale_x, self.scale_y))
    }

    pub fn is_identity(&self, epsilon: f64) -> bool {
        self.x.abs() < epsilon
            && self.y.abs() < epsilon
            && (self.scale_x - 1.0).abs() < epsilon
            && (self.scale_y - 1.0).abs() < epsilon
    }

    /// Inline `transform` value placing the element at this offset.
    pub fn to_css(&self) -> String {
        format!(
            "translate({}px, {}px) scale({}, {})",
            self.x, self.y, self.scale_x, self.scale_y
        )
    }
}

impl Default for FlipDiff {
    fn default() -> Self {
        Self::IDENTITY
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    const EPSILON: f64 = 1e-9;

    fn approx_eq(a: f64, b: f64) -> bool {
        (a - b).abs() < EPSILON
    }

    fn matrix_approx_eq(m: &Matrix2d, n: &Matrix2d) -> bool {
        approx_eq(m.a, n.a)
            && approx_eq(m.b, n.b)
            && approx_eq(m.c, n.c)
            && approx_eq(m.d, n.d)
            && approx_eq(m.e, n.e)
            && approx_eq(m.f, n.f)
    }

    #[test]
    fn test_identity_parsing() {
        assert_eq!(Matrix2d::parse("none").unwrap(), Matrix2d::IDENTITY);
        assert_eq!(Matrix2d::parse("  ").unwrap(), Matrix2d::IDENTITY);
    }

    #[test]
    fn test_parse_matrix() {
        let m = Matrix2d::parse("matrix(2, 0, 0, 3, 10, -5)").unwrap();
        assert_eq!(m, Matrix2d::new(2.0, 0.0, 0.0, 3.0, 10.0, -5.0));
    }

    #[test]
    fn test_parse_own_css_output() {
        let diff = FlipDiff::new(12.5, -4.0, 0.5, 2.0);
        let parsed = Matrix2d::parse(&diff.to_css()).unwrap();
        assert!(matrix_approx_eq(&parsed, &diff.to_matrix()));
    }

    #[test]
    fn test_parse_function_sequence_composes_left_to_right() {
        let m = Matrix2d::parse("translateX(10px) translateY(20px) scale(2)").unwrap();
        // Scale applies first, then the translations.
        assert_eq!(m.apply(1.0, 1.0), (12.0, 22.0));
    }

    #[test]
    fn test_parse_matrix3d_projects_to_2d() {
        let m = Matrix2d::parse(
            "matrix3d(2, 0, 0, 0, 0, 3, 0, 0, 0, 0, 1, 0, 7, 8, 0, 1)",
        )
        .unwrap();
        assert_eq!(m, Matrix2d::new(2.0, 0.0, 0.0, 3.0, 7.0, 8.0));
    }

    #[test]
    fn test_parse_errors() {
        assert_eq!(
            Matrix2d::parse("rotate(45deg)"),
            Err(TransformParseError::UnsupportedFunction("rotate".to_string()))
        );
        assert!(matches!(
            Matrix2d::parse("matrix(1, 2)"),
            Err(TransformParseError::ArgumentCount { found: 2, .. })
        ));
        assert!(matches!(
            Matrix2d::parse("scale(2"),
            Err(TransformParseError::Malformed(_))
        ));
    }

    #[test]
    fn test_multiply_is_not_addition() {
        let residual = Matrix2d::new(0.5, 0.0, 0.0, 0.5, 20.0, 10.0);
        let diff = Matrix2d::translate(100.0, 40.0).multiply(&Matrix2d::scale(2.0, 2.0));
        let product = residual.multiply(&diff);

        // Residual scale halves the translation before its own offset applies.
        assert_eq!(product, Matrix2d::new(1.0, 0.0, 0.0, 1.0, 70.0, 30.0));
    }

    #[test]
    fn test_product_matches_chained_multiply() {
        let t = Matrix2d::translate(3.0, 4.0);
        let s = Matrix2d::scale(2.0, 5.0);
        let r = Matrix2d::new(1.5, 0.0, 0.0, 0.5, -2.0, 1.0);
        assert!(matrix_approx_eq(
            &Matrix2d::product([&r, &t, &s]),
            &r.multiply(&t).multiply(&s)
        ));
    }

    #[test]
    fn test_transform_rect() {
        let m = Matrix2d::translate(10.0, 20.0).multiply(&Matrix2d::scale(2.0, 0.5));
        let rect = m.transform_rect(&Rect::new(5.0, 4.0, 10.0, 10.0));
        assert_eq!(rect, Rect::new(20.0, 22.0, 20.0, 5.0));
    }

    #[test]
    fn test_diff_identity_check() {
        assert!(FlipDiff::IDENTITY.is_identity(EPSILON));
        assert!(!FlipDiff::new(0.0, 0.0, 2.0, 2.0).is_identity(EPSILON));
    }
}
