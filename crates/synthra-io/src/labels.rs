// Copyright 2025 eraflo
//
// Licensed under the Apache License, Version 2.0 (the "License");
// you may not use this file except in compliance with the License.
// You may obtain a copy of the License at
//
//     http://www.apache.org/licenses/LICENSE-2.0
//
// Unless required by applicable law or agreed to in writing, software
// distributed under the License is distributed on an "AS IS" BASIS,
// WITHOUT WARRANTIES OR CONDITIONS OF ANY KIND, either express or implied.
// See the License for the specific language governing permissions and
// limitations under the License.

//! YOLO label lines: `<class_id> <x_center> <y_center> <width> <height>`.

use synthra_core::{ClassId, Detection, NormalizedBox};
use thiserror::Error;

/// One parsed label line.
#[derive(Debug, Clone, Copy, PartialEq)]
pub struct LabelLine {
    /// Class of the object.
    pub class_id: ClassId,
    /// Normalized box.
    pub bbox: NormalizedBox,
}

/// Why a label line was rejected.
#[derive(Debug, Clone, PartialEq, Error)]
pub enum LabelParseError {
    /// Not exactly five whitespace-separated fields.
    #[error("expected 5 fields, found {0}")]
    FieldCount(usize),
    /// The class id is not a non-negative integer.
    #[error("invalid class id '{0}'")]
    ClassId(String),
    /// A coordinate is not a number.
    #[error("invalid number '{0}'")]
    Number(String),
    /// The box leaves the unit square or has no extent.
    #[error("box ({x_center}, {y_center}, {width}, {height}) is out of range")]
    OutOfRange {
        /// Horizontal center.
        x_center: f64,
        /// Vertical center.
        y_center: f64,
        /// Width.
        width: f64,
        /// Height.
        height: f64,
    },
}

/// Parses and range-checks one label line.
pub fn parse_label_line(line: &str) -> Result<LabelLine, LabelParseError> {
    let fields: Vec<&str> = line.split_whitespace().collect();
    let &[class, x, y, w, h] = fields.as_slice() else {
        return Err(LabelParseError::FieldCount(fields.len()));
    };

    let class_id = class
        .parse::<u32>()
        .map(ClassId)
        .map_err(|_| LabelParseError::ClassId(class.to_owned()))?;
    let number = |s: &str| {
        s.parse::<f64>()
            .ok()
            .filter(|v| v.is_finite())
            .ok_or_else(|| LabelParseError::Number(s.to_owned()))
    };
    let bbox = NormalizedBox {
        x_center: number(x)?,
        y_center: number(y)?,
        width: number(w)?,
        height: number(h)?,
    };

    if !bbox.is_valid() {
        return Err(LabelParseError::OutOfRange {
            x_center: bbox.x_center,
            y_center: bbox.y_center,
            width: bbox.width,
            height: bbox.height,
        });
    }
    Ok(LabelLine { class_id, bbox })
}

/// A detection whose box cannot be written with the configured precision.
#[derive(Debug, Clone, PartialEq, Eq, Error)]
#[error("box of instance {instance_id} collapses when written with {precision} decimals")]
pub struct LabelFormatError {
    /// Segmentation instance of the detection.
    pub instance_id: u32,
    /// Decimals requested.
    pub precision: usize,
}

/// Renders the label file for a frame, one line per detection.
pub fn format_label_file(
    detections: &[Detection],
    precision: usize,
) -> Result<String, LabelFormatError> {
    let mut text = String::new();
    for detection in detections {
        let line = detection
            .to_label_line(precision)
            .ok_or(LabelFormatError {
                instance_id: detection.instance_id(),
                precision,
            })?;
        text.push_str(&line);
        text.push('\n');
    }
    Ok(text)
}

#[cfg(test)]
mod tests {
    use super::*;
    use approx::assert_relative_eq;
    use synthra_core::PixelBox;

    #[test]
    fn well_formed_line_parses() {
        let line = parse_label_line("2 0.500000 0.250000 0.100000 0.200000").unwrap();
        assert_eq!(line.class_id, ClassId(2));
        assert_relative_eq!(line.bbox.x_center, 0.5);
        assert_relative_eq!(line.bbox.height, 0.2);
    }

    #[test]
    fn wrong_field_count_is_reported() {
        assert_eq!(
            parse_label_line("1 0.5 0.5 0.1"),
            Err(LabelParseError::FieldCount(4))
        );
        assert_eq!(parse_label_line(""), Err(LabelParseError::FieldCount(0)));
    }

    #[test]
    fn negative_class_is_rejected() {
        assert!(matches!(
            parse_label_line("-1 0.5 0.5 0.1 0.1"),
            Err(LabelParseError::ClassId(_))
        ));
    }

    #[test]
    fn box_outside_the_image_is_rejected() {
        assert!(matches!(
            parse_label_line("0 0.95 0.5 0.2 0.1"),
            Err(LabelParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_label_line("0 0.5 0.5 0.0 0.1"),
            Err(LabelParseError::OutOfRange { .. })
        ));
        assert!(matches!(
            parse_label_line("0 0.5 nan 0.1 0.1"),
            Err(LabelParseError::Number(_))
        ));
    }

    #[test]
    fn formatted_detections_parse_back() {
        let bbox = NormalizedBox {
            x_center: 0.25,
            y_center: 0.75,
            width: 0.125,
            height: 0.0625,
        };
        let detection = Detection::new(ClassId(1), bbox, 3).unwrap();
        let text = format_label_file(&[detection], 6).unwrap();

        assert_eq!(text, "1 0.250000 0.750000 0.125000 0.062500\n");
        let parsed = parse_label_line(text.trim_end()).unwrap();
        assert_eq!(parsed.class_id, ClassId(1));
        assert_relative_eq!(parsed.bbox.width, 0.125);
    }

    #[test]
    fn corner_boxes_written_at_six_decimals_parse_back() {
        // A 1-pixel step at the top-left corner of a 640x480 frame.
        let bbox = PixelBox {
            min_x: 0,
            min_y: 0,
            max_x: 1,
            max_y: 1,
        }
        .normalize(640, 480)
        .unwrap();
        let detection = Detection::new(ClassId(0), bbox, 1).unwrap();

        let text = format_label_file(&[detection], 6).unwrap();

        assert_eq!(text, "0 0.000781 0.001042 0.001562 0.002083\n");
        assert!(parse_label_line(text.trim_end()).is_ok());
    }

    #[test]
    fn collapsing_boxes_are_refused() {
        let bbox = NormalizedBox {
            x_center: 0.25,
            y_center: 0.25,
            width: 0.1,
            height: 0.1,
        };
        let detection = Detection::new(ClassId(0), bbox, 4).unwrap();

        let result = format_label_file(&[detection], 0);

        assert_eq!(
            result,
            Err(LabelFormatError {
                instance_id: 4,
                precision: 0
            })
        );
    }
}
