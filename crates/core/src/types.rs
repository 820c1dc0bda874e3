use std::fmt;

/// Device serial as reported by `adb devices`
pub type DeviceId = String;

/// Screen dimensions in pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct ScreenSize {
    pub width: i32,
    pub height: i32,
}

impl ScreenSize {
    pub fn contains(&self, p: Point) -> bool {
        (0..=self.width).contains(&p.x) && (0..=self.height).contains(&p.y)
    }
}

impl fmt::Display for ScreenSize {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "{}x{}", self.width, self.height)
    }
}

/// Tap coordinate in screen pixels
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct Point {
    pub x: i32,
    pub y: i32,
}

impl Point {
    pub fn new(x: i32, y: i32) -> Self {
        Self { x, y }
    }
}

impl fmt::Display for Point {
    fn fmt(&self, f: &mut fmt::Formatter<'_>) -> fmt::Result {
        write!(f, "({}, {})", self.x, self.y)
    }
}

/// Element extent as written in the UI dump: `[l,t][r,b]`
#[derive(Debug, Clone, Copy, PartialEq, Eq)]
pub struct BoundingBox {
    pub l: i32,
    pub t: i32,
    pub r: i32,
    pub b: i32,
}

impl BoundingBox {
    /// Tap point for this box: integer center, rounded toward the top-left.
    pub fn center(&self) -> Point {
        // midpoint of two i32 values always fits back in an i32
        let mid = |a: i32, b: i32| ((a as i64 + b as i64).div_euclid(2)) as i32;
        Point {
            x: mid(self.l, self.r),
            y: mid(self.t, self.b),
        }
    }
}

/// Android app to drive
#[derive(Debug, Clone, PartialEq, Eq)]
pub struct AppTarget {
    pub package: String,
    pub activity: String,
}

impl AppTarget {
    /// Component name for `am start -n`.
    pub fn component(&self) -> String {
        format!("{}/{}", self.package, self.activity)
    }
}

impl Default for AppTarget {
    fn default() -> Self {
        Self {
            package: "com.nu.production".into(),
            activity: "br.com.nubank.shell.screens.splash.SplashActivity".into(),
        }
    }
}
