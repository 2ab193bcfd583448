//! Auxiliary parameters for image-aware and limit-aware rules.

use crate::error::{AuditError, Result};
use regex::Regex;
use std::sync::LazyLock;

/// The image a container is expected to run.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct ImageParams {
    pub name: String,
    pub tag: String,
}

impl ImageParams {
    /// Split `name[:tag]`. The tag separator is the last `:` after the last
    /// `/`, so registry ports stay part of the name.
    pub fn new(image: &str) -> Self {
        let (name, tag) = split_image(image);
        Self {
            name: name.to_string(),
            tag: tag.to_string(),
        }
    }

    /// Both a name and a tag are required before any image rule runs.
    pub fn validate(&self) -> Result<()> {
        if self.name.is_empty() {
            return Err(AuditError::MissingImageName);
        }
        if self.tag.is_empty() {
            return Err(AuditError::MissingImageTag);
        }
        Ok(())
    }
}

/// Split an image reference into name and tag (empty when absent).
pub fn split_image(image: &str) -> (&str, &str) {
    let name_start = image.rfind('/').map(|i| i + 1).unwrap_or(0);
    match image[name_start..].rfind(':') {
        Some(i) => {
            let split = name_start + i;
            (&image[..split], &image[split + 1..])
        }
        None => (image, ""),
    }
}

/// Maximum CPU and memory limits a container may declare.
#[derive(Debug, Clone, Default, PartialEq, Eq)]
pub struct LimitParams {
    pub cpu: Option<String>,
    pub memory: Option<String>,
}

impl LimitParams {
    pub fn new(cpu: Option<String>, memory: Option<String>) -> Self {
        Self { cpu, memory }
    }

    pub fn cpu_millicores(&self) -> Option<u64> {
        self.cpu.as_deref().and_then(parse_cpu_to_millicores)
    }

    pub fn memory_bytes(&self) -> Option<u64> {
        self.memory.as_deref().and_then(parse_memory_to_bytes)
    }

    /// Configured values must be valid quantities.
    pub fn validate(&self) -> Result<()> {
        if let Some(cpu) = &self.cpu
            && parse_cpu_to_millicores(cpu).is_none()
        {
            return Err(AuditError::InvalidLimit {
                resource: "cpu",
                value: cpu.clone(),
            });
        }
        if let Some(memory) = &self.memory
            && parse_memory_to_bytes(memory).is_none()
        {
            return Err(AuditError::InvalidLimit {
                resource: "memory",
                value: memory.clone(),
            });
        }
        Ok(())
    }
}

static CPU_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(m)?$").unwrap());

/// Parse a CPU quantity to millicores.
///
/// - "100m" -> 100
/// - "1.5" -> 1500
pub fn parse_cpu_to_millicores(cpu: &str) -> Option<u64> {
    let caps = CPU_REGEX.captures(cpu.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    if caps.get(2).is_some() {
        Some(value as u64)
    } else {
        Some((value * 1000.0) as u64)
    }
}

static MEMORY_REGEX: LazyLock<Regex> =
    LazyLock::new(|| Regex::new(r"^(\d+(?:\.\d+)?)(Ki|Mi|Gi|Ti|Pi|Ei|k|K|M|G|T|P|E)?$").unwrap());

/// Parse a memory quantity to bytes.
///
/// - "128Mi" -> 134217728
/// - "1G" -> 1000000000
pub fn parse_memory_to_bytes(memory: &str) -> Option<u64> {
    let caps = MEMORY_REGEX.captures(memory.trim())?;
    let value: f64 = caps.get(1)?.as_str().parse().ok()?;
    let multiplier = match caps.get(2).map(|m| m.as_str()).unwrap_or("") {
        "" => 1.0,
        "Ki" => 1024f64,
        "Mi" => 1024f64.powi(2),
        "Gi" => 1024f64.powi(3),
        "Ti" => 1024f64.powi(4),
        "Pi" => 1024f64.powi(5),
        "Ei" => 1024f64.powi(6),
        "k" | "K" => 1000f64,
        "M" => 1000f64.powi(2),
        "G" => 1000f64.powi(3),
        "T" => 1000f64.powi(4),
        "P" => 1000f64.powi(5),
        "E" => 1000f64.powi(6),
        _ => return None,
    };
    Some((value * multiplier) as u64)
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_split_image() {
        assert_eq!(split_image("nginx:1.25"), ("nginx", "1.25"));
        assert_eq!(split_image("nginx"), ("nginx", ""));
        assert_eq!(
            split_image("registry.local:5000/team/nginx:1.25"),
            ("registry.local:5000/team/nginx", "1.25")
        );
        assert_eq!(
            split_image("registry.local:5000/team/nginx"),
            ("registry.local:5000/team/nginx", "")
        );
    }

    #[test]
    fn test_image_params_validation() {
        assert!(ImageParams::new("nginx:1.25").validate().is_ok());
        assert!(matches!(
            ImageParams::new("").validate(),
            Err(AuditError::MissingImageName)
        ));
        assert!(matches!(
            ImageParams::new("nginx").validate(),
            Err(AuditError::MissingImageTag)
        ));
        assert_eq!(
            ImageParams::new("nginx").validate().unwrap_err().to_string(),
            "Empty image tag. Are you missing the image tag?"
        );
    }

    #[test]
    fn test_parse_cpu() {
        assert_eq!(parse_cpu_to_millicores("100m"), Some(100));
        assert_eq!(parse_cpu_to_millicores("1"), Some(1000));
        assert_eq!(parse_cpu_to_millicores("1.5"), Some(1500));
        assert_eq!(parse_cpu_to_millicores("lots"), None);
        assert_eq!(parse_cpu_to_millicores(""), None);
    }

    #[test]
    fn test_parse_memory() {
        assert_eq!(parse_memory_to_bytes("128Mi"), Some(134_217_728));
        assert_eq!(parse_memory_to_bytes("1Gi"), Some(1_073_741_824));
        assert_eq!(parse_memory_to_bytes("1G"), Some(1_000_000_000));
        assert_eq!(parse_memory_to_bytes("512"), Some(512));
        assert_eq!(parse_memory_to_bytes("12XB"), None);
    }

    #[test]
    fn test_limit_params_validation() {
        let limits = LimitParams::new(Some("500m".to_string()), Some("256Mi".to_string()));
        assert!(limits.validate().is_ok());
        assert_eq!(limits.cpu_millicores(), Some(500));
        assert_eq!(limits.memory_bytes(), Some(268_435_456));

        assert!(LimitParams::default().validate().is_ok());

        let bad = LimitParams::new(Some("fast".to_string()), None);
        assert!(matches!(
            bad.validate(),
            Err(AuditError::InvalidLimit { resource: "cpu", .. })
        ));
    }
}
