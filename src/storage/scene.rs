//! The `Scene` contract and the disk geometry that backs it.
//!
//! A scene is immutable for the duration of a render: `closest_point` never
//! mutates state and is safe to call concurrently from every worker thread.
//! Cost is `O(|geometry|)`, which is exactly what the `ClosestPointGrid`
//! exists to amortize away.

use std::fs;
use std::path::Path;

use crate::error::ConfigError;
use crate::storage::vec_types::{Vec2, Vec3};

/// A single disk: center, radius, and a constant boundary color.
///
/// Disks are the only supported geometry (explicitly out of scope: "geometry
/// beyond disks").
#[derive(Debug, Clone, Copy)]
pub struct Disk {
    pub center: Vec2,
    pub radius: f64,
    pub boundary: Vec3,
}

impl Disk {
    /// Closest point on the disk's boundary circle to `p`, and the distance
    /// to it. If `p` coincides with the center, an arbitrary point on the
    /// circle is returned (the direction is undefined, but finite).
    fn closest_point(&self, p: Vec2) -> (Vec2, f64) {
        let d = p - self.center;
        let len = (d.x * d.x + d.y * d.y).sqrt();
        let dir = if len > 1e-12 {
            euclid::Vector2D::new(d.x / len, d.y / len)
        } else {
            euclid::Vector2D::new(1.0, 0.0)
        };
        let q = self.center + dir * self.radius;
        let dist = (q - p).length();
        (q, dist)
    }
}

/// The axis-aligned window a scene is defined over, `(xmin, ymin, xmax,
/// ymax)`.
#[derive(Debug, Clone, Copy)]
pub struct Window {
    pub xmin: f64,
    pub ymin: f64,
    pub xmax: f64,
    pub ymax: f64,
}

impl Window {
    pub fn dx(&self) -> f64 {
        self.xmax - self.xmin
    }
    pub fn dy(&self) -> f64 {
        self.ymax - self.ymin
    }
}

/// An immutable scene: a rectangular window and a set of boundary disks.
///
/// Construction is the only place an empty scene is rejected; once built, a
/// `Scene` always answers `closest_point` queries.
#[derive(Debug)]
pub struct Scene {
    pub name: String,
    pub window: Window,
    disks: Vec<Disk>,
}

impl Scene {
    pub fn new(name: String, window: Window, disks: Vec<Disk>) -> Scene {
        Scene { name, window, disks }
    }

    /// Nearest boundary point to `p`, its color, and the distance to it.
    /// `O(|geometry|)`; never fails (construction guarantees non-empty
    /// geometry).
    pub fn closest_point(&self, p: Vec2) -> (Vec2, Vec3, f64) {
        let mut best_dist = f64::INFINITY;
        let mut best_q = p;
        let mut best_b = Vec3::ZERO;
        for disk in &self.disks {
            let (q, dist) = disk.closest_point(p);
            if dist < best_dist {
                best_dist = dist;
                best_q = q;
                best_b = disk.boundary;
            }
        }
        (best_q, best_b, best_dist)
    }

    /// Load a scene from the text format: first line is the window,
    /// each following line is `cx, cy, r, R, G, B`. Blank trailing lines are
    /// ignored; any other malformed line is a `ConfigError` naming the line
    /// number, so the diagnostic identifies "the scene
    /// line number."
    pub fn load(path: &Path) -> Result<Scene, ConfigError> {
        let path_str = path.display().to_string();
        let contents = fs::read_to_string(path).map_err(|source| ConfigError::SceneUnopenable {
            path: path_str.clone(),
            source,
        })?;

        let mut lines = contents.lines().enumerate();
        let (_, window_line) = lines.next().ok_or_else(|| ConfigError::MissingWindow {
            path: path_str.clone(),
        })?;
        let window = parse_window(window_line).ok_or_else(|| ConfigError::MalformedSceneLine {
            path: path_str.clone(),
            line: 1,
            content: window_line.to_string(),
        })?;

        let mut disks = Vec::new();
        for (idx, line) in lines {
            let trimmed = line.trim();
            if trimmed.is_empty() {
                continue;
            }
            let disk = parse_disk(trimmed).ok_or_else(|| ConfigError::MalformedSceneLine {
                path: path_str.clone(),
                line: idx + 1,
                content: line.to_string(),
            })?;
            disks.push(disk);
        }

        if disks.is_empty() {
            return Err(ConfigError::EmptyScene { path: path_str });
        }

        let name = path
            .file_stem()
            .map(|s| s.to_string_lossy().into_owned())
            .unwrap_or_else(|| "scene".to_string());

        Ok(Scene::new(name, window, disks))
    }
}

fn parse_fields(line: &str) -> Option<Vec<f64>> {
    line.split(',')
        .map(|field| {
            let trimmed = field.trim();
            if trimmed.is_empty() {
                None
            } else {
                trimmed.parse::<f64>().ok()
            }
        })
        .collect()
}

fn parse_window(line: &str) -> Option<Window> {
    let fields = parse_fields(line)?;
    if fields.len() != 4 {
        return None;
    }
    Some(Window {
        xmin: fields[0],
        ymin: fields[1],
        xmax: fields[2],
        ymax: fields[3],
    })
}

fn parse_disk(line: &str) -> Option<Disk> {
    let fields = parse_fields(line)?;
    if fields.len() != 6 {
        return None;
    }
    Some(Disk {
        center: Vec2::new(fields[0], fields[1]),
        radius: fields[2],
        boundary: Vec3::new(fields[3] as f32, fields[4] as f32, fields[5] as f32),
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn parses_a_minimal_scene() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.txt");
        std::fs::write(&path, "-1,-1,1,1\n0,0,0.5,1,0,0\n").unwrap();
        let scene = Scene::load(&path).unwrap();
        assert_eq!(scene.window.xmin, -1.0);
        assert_eq!(scene.window.xmax, 1.0);
        let (_, b, dist) = scene.closest_point(Vec2::new(0.0, 0.0));
        assert!((dist - 0.5).abs() < 1e-9);
        assert_eq!(b, Vec3::new(1.0, 0.0, 0.0));
    }

    #[test]
    fn ignores_trailing_blank_lines() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.txt");
        std::fs::write(&path, "-1,-1,1,1\n0,0,0.5,1,0,0\n\n\n").unwrap();
        assert!(Scene::load(&path).is_ok());
    }

    #[test]
    fn rejects_malformed_line_with_its_number() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.txt");
        std::fs::write(&path, "-1,-1,1,1\n0,0,0.5,1,0,0\nbroken\n").unwrap();
        let err = Scene::load(&path).unwrap_err();
        match err {
            ConfigError::MalformedSceneLine { line, .. } => assert_eq!(line, 3),
            other => panic!("expected MalformedSceneLine, got {other:?}"),
        }
    }

    #[test]
    fn rejects_empty_scene() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.txt");
        std::fs::write(&path, "-1,-1,1,1\n").unwrap();
        assert!(matches!(
            Scene::load(&path).unwrap_err(),
            ConfigError::EmptyScene { .. }
        ));
    }

    #[test]
    fn rejects_empty_field() {
        let dir = tempfile::tempdir().unwrap();
        let path = dir.path().join("scene.txt");
        std::fs::write(&path, "-1,-1,1,1\n0,,0.5,1,0,0\n").unwrap();
        assert!(matches!(
            Scene::load(&path).unwrap_err(),
            ConfigError::MalformedSceneLine { .. }
        ));
    }
}
