//! Version 5 and version 6 page layouts.

use super::cursor::ByteCursor;
use super::DecodeError;
use crate::model::{Line, PenColor, PenType, Point};

/// Length of the ASCII header at the start of every page file.
pub const HEADER_LEN: usize = 43;
pub const HEADER_V5: &str = "reMarkable .lines file, version=5          ";
pub const HEADER_V6: &str = "reMarkable .lines file, version=6          ";

/// Block type of scene-line items in the v6 layout.
const BLOCK_SCENE_LINE: u8 = 5;
/// Scene item type of a stroke.
const ITEM_LINE: u8 = 3;
/// Highest block version this decoder understands.
const MAX_BLOCK_VERSION: u8 = 2;

/// Decode one page buffer into its strokes.
pub fn decode_page(buffer: &[u8]) -> Result<Vec<Line>, DecodeError> {
    let mut cursor = ByteCursor::new(buffer);
    let header = cursor.read_fixed_string(HEADER_LEN)?;

    match header.as_str() {
        HEADER_V5 => read_v5(&mut cursor),
        HEADER_V6 => read_v6(&mut cursor),
        _ => Err(DecodeError::UnknownHeader(header.trim_end().to_string())),
    }
}

fn read_count(cursor: &mut ByteCursor<'_>, what: &str) -> Result<usize, DecodeError> {
    let position = cursor.position();
    let count = cursor.read_i32()?;
    usize::try_from(count).map_err(|_| DecodeError::InvalidBlock {
        position,
        message: format!("negative {what} count {count}"),
    })
}

fn read_v5(cursor: &mut ByteCursor<'_>) -> Result<Vec<Line>, DecodeError> {
    let mut lines = Vec::new();
    let layer_count = read_count(cursor, "layer")?;

    for _ in 0..layer_count {
        let line_count = read_count(cursor, "line")?;
        for _ in 0..line_count {
            let pen_type = PenType::from(cursor.read_i32()?);
            let pen_color = PenColor::from(cursor.read_i32()?);
            cursor.read_i32()?; // unused
            cursor.read_f32()?; // thickness scale
            cursor.read_f32()?; // unused

            let point_count = read_count(cursor, "point")?;
            let mut points = Vec::with_capacity(point_count.min(cursor.remaining() / 24));
            for _ in 0..point_count {
                let x = cursor.read_f32()?;
                let y = cursor.read_f32()?;
                // speed, direction, width, pressure
                cursor.skip(4 * 4)?;
                points.push(Point::new(x, y));
            }

            lines.push(Line {
                pen_type,
                pen_color,
                points,
            });
        }
    }

    Ok(lines)
}

fn read_v6(cursor: &mut ByteCursor<'_>) -> Result<Vec<Line>, DecodeError> {
    let mut lines = Vec::new();

    while cursor.position() < cursor.len() {
        let header_start = cursor.position();
        let length = cursor.read_u32()? as usize;
        let unknown = cursor.read_u8()?;
        let version_min = cursor.read_u8()?;
        let version_current = cursor.read_u8()?;
        let block_type = cursor.read_u8()?;

        if unknown != 0 {
            return Err(DecodeError::InvalidBlock {
                position: header_start,
                message: format!("reserved header byte is {unknown}, expected 0"),
            });
        }
        if version_min > version_current || version_current > MAX_BLOCK_VERSION {
            return Err(DecodeError::InvalidBlock {
                position: header_start,
                message: format!(
                    "unsupported block version {version_min}..{version_current}"
                ),
            });
        }

        let block_end = cursor.position() + length;

        if block_type != BLOCK_SCENE_LINE {
            cursor.skip(length)?;
            continue;
        }

        cursor.read_id(1)?; // parent
        cursor.read_id(2)?; // item
        cursor.read_id(3)?; // left
        cursor.read_id(4)?; // right
        cursor.read_u32_tagged(5)?; // deleted length

        if cursor.position() < block_end {
            let sub_length = cursor.read_sub_block_length(6)?;
            let sub_end = cursor.position() + sub_length;
            let item_type = cursor.read_u8()?;
            if item_type == ITEM_LINE {
                lines.push(read_v6_line(cursor, version_current)?);
            } else {
                skip_to(cursor, sub_end, "scene item")?;
            }
        }

        skip_to(cursor, block_end, "block")?;
    }

    Ok(lines)
}

/// Advance to `end`, tolerating unread trailing fields.
fn skip_to(cursor: &mut ByteCursor<'_>, end: usize, what: &str) -> Result<(), DecodeError> {
    let position = cursor.position();
    if position > end {
        return Err(DecodeError::InvalidBlock {
            position,
            message: format!("{what} overran its declared end at byte {end}"),
        });
    }
    cursor.skip(end - position)
}

fn read_v6_line(cursor: &mut ByteCursor<'_>, version: u8) -> Result<Line, DecodeError> {
    if version != 1 && version != 2 {
        return Err(DecodeError::InvalidBlock {
            position: cursor.position(),
            message: format!("unsupported line version {version}"),
        });
    }

    let pen_type = PenType::from(cursor.read_i32_tagged(1)?);
    let pen_color = PenColor::from(cursor.read_i32_tagged(2)?);
    cursor.read_f64_tagged(3)?; // thickness scale
    cursor.read_f32_tagged(4)?; // starting length

    let points_length = cursor.read_sub_block_length(5)?;
    let points_end = cursor.position() + points_length;
    let mut points = Vec::new();
    while cursor.position() < points_end {
        let x = cursor.read_f32()?;
        let y = cursor.read_f32()?;
        if version == 1 {
            // speed, direction, width, pressure
            cursor.skip(4 * 4)?;
        } else {
            cursor.read_i16()?; // speed
            cursor.read_i16()?; // width
            cursor.read_u8()?; // direction
            cursor.read_u8()?; // pressure
        }
        points.push(Point::new(x, y));
    }
    if cursor.position() != points_end {
        return Err(DecodeError::InvalidBlock {
            position: cursor.position(),
            message: format!("point data overran its declared end at byte {points_end}"),
        });
    }

    cursor.read_id(6)?; // timestamp

    Ok(Line {
        pen_type,
        pen_color,
        points,
    })
}

#[cfg(test)]
mod tests {
    use super::*;

    // ── v5 fixtures ───────────────────────────────────────────────

    fn v5_page(lines: &[(i32, i32, Vec<(f32, f32)>)]) -> Vec<u8> {
        let mut buf = HEADER_V5.as_bytes().to_vec();
        buf.extend_from_slice(&1i32.to_le_bytes());
        buf.extend_from_slice(&i32::try_from(lines.len()).unwrap().to_le_bytes());
        for (pen, color, points) in lines {
            buf.extend_from_slice(&pen.to_le_bytes());
            buf.extend_from_slice(&color.to_le_bytes());
            buf.extend_from_slice(&0i32.to_le_bytes());
            buf.extend_from_slice(&2.0f32.to_le_bytes());
            buf.extend_from_slice(&0.0f32.to_le_bytes());
            buf.extend_from_slice(&i32::try_from(points.len()).unwrap().to_le_bytes());
            for (x, y) in points {
                buf.extend_from_slice(&x.to_le_bytes());
                buf.extend_from_slice(&y.to_le_bytes());
                for extra in [0.1f32, 0.2, 0.3, 0.4] {
                    buf.extend_from_slice(&extra.to_le_bytes());
                }
            }
        }
        buf
    }

    // ── v6 fixtures ───────────────────────────────────────────────

    fn tag(buf: &mut Vec<u8>, index: u8, wire: u8) {
        buf.push((index << 4) | wire);
    }

    fn id_field(buf: &mut Vec<u8>, index: u8) {
        tag(buf, index, 0xF);
        buf.push(0);
        buf.push(1);
    }

    fn line_body(version: u8, pen: i32, color: i32, points: &[(f32, f32)]) -> Vec<u8> {
        let mut body = Vec::new();
        tag(&mut body, 1, 0x4);
        body.extend_from_slice(&pen.to_le_bytes());
        tag(&mut body, 2, 0x4);
        body.extend_from_slice(&color.to_le_bytes());
        tag(&mut body, 3, 0x8);
        body.extend_from_slice(&1.0f64.to_le_bytes());
        tag(&mut body, 4, 0x4);
        body.extend_from_slice(&0.0f32.to_le_bytes());

        let mut point_bytes = Vec::new();
        for (x, y) in points {
            point_bytes.extend_from_slice(&x.to_le_bytes());
            point_bytes.extend_from_slice(&y.to_le_bytes());
            if version == 1 {
                point_bytes.extend_from_slice(&[0u8; 16]);
            } else {
                point_bytes.extend_from_slice(&[0u8; 6]);
            }
        }
        tag(&mut body, 5, 0xC);
        body.extend_from_slice(&u32::try_from(point_bytes.len()).unwrap().to_le_bytes());
        body.extend_from_slice(&point_bytes);
        id_field(&mut body, 6);
        body
    }

    fn scene_block(version: u8, item: Option<(u8, Vec<u8>)>, trailing: &[u8]) -> Vec<u8> {
        let mut body = Vec::new();
        for index in 1..=4 {
            id_field(&mut body, index);
        }
        tag(&mut body, 5, 0x4);
        body.extend_from_slice(&0u32.to_le_bytes());
        if let Some((item_type, content)) = item {
            tag(&mut body, 6, 0xC);
            body.extend_from_slice(&u32::try_from(content.len() + 1).unwrap().to_le_bytes());
            body.push(item_type);
            body.extend_from_slice(&content);
        }
        body.extend_from_slice(trailing);
        block(BLOCK_SCENE_LINE, 1, version, &body)
    }

    fn block(block_type: u8, min: u8, current: u8, body: &[u8]) -> Vec<u8> {
        let mut buf = Vec::new();
        buf.extend_from_slice(&u32::try_from(body.len()).unwrap().to_le_bytes());
        buf.push(0);
        buf.push(min);
        buf.push(current);
        buf.push(block_type);
        buf.extend_from_slice(body);
        buf
    }

    fn v6_page(blocks: &[Vec<u8>]) -> Vec<u8> {
        let mut buf = HEADER_V6.as_bytes().to_vec();
        for b in blocks {
            buf.extend_from_slice(b);
        }
        buf
    }

    // ── header ────────────────────────────────────────────────────

    #[test]
    fn test_header_constants_are_43_bytes() {
        assert_eq!(HEADER_V5.len(), HEADER_LEN);
        assert_eq!(HEADER_V6.len(), HEADER_LEN);
    }

    #[test]
    fn test_unknown_header_rejected() {
        let mut buf = b"reMarkable .lines file, version=3          ".to_vec();
        buf.extend_from_slice(&[0u8; 64]);
        let err = decode_page(&buf).unwrap_err();
        assert!(matches!(err, DecodeError::UnknownHeader(ref h) if h.ends_with("version=3")));
    }

    #[test]
    fn test_short_header_rejected() {
        assert!(matches!(
            decode_page(b"reMarkable"),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    // ── v5 ────────────────────────────────────────────────────────

    #[test]
    fn test_v5_minimal_scenario() {
        let buf = v5_page(&[(2, 0, vec![(1.0, 2.0)])]);
        let lines = decode_page(&buf).unwrap();
        assert_eq!(
            lines,
            vec![Line {
                pen_type: PenType::BallPoint1,
                pen_color: PenColor::Black,
                points: vec![Point::new(1.0, 2.0)],
            }]
        );
    }

    #[test]
    fn test_v5_multiple_lines_and_points() {
        let buf = v5_page(&[
            (17, 6, vec![(10.5, 20.25), (11.0, 21.0), (12.0, 22.5)]),
            (6, 0, vec![(0.0, 0.0)]),
            (99, 42, vec![]),
        ]);
        let lines = decode_page(&buf).unwrap();
        assert_eq!(lines.len(), 3);
        assert_eq!(lines[0].pen_type, PenType::Fineliner2);
        assert_eq!(lines[0].pen_color, PenColor::Blue);
        assert_eq!(lines[0].points.len(), 3);
        assert_eq!(lines[0].points[1], Point::new(11.0, 21.0));
        assert_eq!(lines[1].pen_type, PenType::Eraser);
        assert_eq!(lines[2].pen_type, PenType::Unknown(99));
        assert_eq!(lines[2].pen_color, PenColor::Unknown(42));
        assert!(lines[2].points.is_empty());
    }

    #[test]
    fn test_v5_truncated_point_fails() {
        let mut buf = v5_page(&[(2, 0, vec![(1.0, 2.0)])]);
        buf.truncate(buf.len() - 3);
        assert!(matches!(
            decode_page(&buf),
            Err(DecodeError::UnexpectedEof { .. })
        ));
    }

    #[test]
    fn test_v5_negative_count_fails() {
        let mut buf = HEADER_V5.as_bytes().to_vec();
        buf.extend_from_slice(&(-1i32).to_le_bytes());
        assert!(matches!(
            decode_page(&buf),
            Err(DecodeError::InvalidBlock { .. })
        ));
    }

    // ── v6 ────────────────────────────────────────────────────────

    #[test]
    fn test_v6_line_version_2() {
        let body = line_body(2, 15, 7, &[(1.0, 2.0), (3.5, -4.25)]);
        let buf = v6_page(&[scene_block(2, Some((ITEM_LINE, body)), &[])]);
        let lines = decode_page(&buf).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].pen_type, PenType::BallPoint2);
        assert_eq!(lines[0].pen_color, PenColor::Red);
        assert_eq!(
            lines[0].points,
            vec![Point::new(1.0, 2.0), Point::new(3.5, -4.25)]
        );
    }

    #[test]
    fn test_v6_line_version_1() {
        let body = line_body(1, 18, 9, &[(5.0, 6.0)]);
        let buf = v6_page(&[scene_block(1, Some((ITEM_LINE, body)), &[])]);
        let lines = decode_page(&buf).unwrap();
        assert_eq!(lines[0].pen_type, PenType::Highlighter2);
        assert_eq!(lines[0].pen_color, PenColor::Highlight);
        assert_eq!(lines[0].points, vec![Point::new(5.0, 6.0)]);
    }

    #[test]
    fn test_v6_skips_other_blocks_and_items() {
        let other = block(1, 1, 1, &[0xAA; 12]);
        let group = scene_block(2, Some((1, vec![0x55; 9])), &[]);
        let deleted = scene_block(2, None, &[]);
        let stroke = scene_block(2, Some((ITEM_LINE, line_body(2, 2, 0, &[(1.0, 1.0)]))), &[]);
        let buf = v6_page(&[other, group, deleted, stroke]);

        let lines = decode_page(&buf).unwrap();
        assert_eq!(lines.len(), 1);
        assert_eq!(lines[0].pen_type, PenType::BallPoint1);
    }

    #[test]
    fn test_v6_tolerates_trailing_fields() {
        let body = line_body(2, 4, 0, &[(9.0, 8.0)]);
        let stroke = scene_block(2, Some((ITEM_LINE, body)), &[0x7C, 0x00, 0x00, 0x00, 0x00]);
        let again = scene_block(2, Some((ITEM_LINE, line_body(2, 4, 0, &[(7.0, 6.0)]))), &[]);
        let lines = decode_page(&v6_page(&[stroke, again])).unwrap();
        assert_eq!(lines.len(), 2);
        assert_eq!(lines[1].points, vec![Point::new(7.0, 6.0)]);
    }

    #[test]
    fn test_v6_corrupted_tag_index_fails() {
        let mut body = line_body(2, 15, 0, &[(1.0, 2.0)]);
        // pen type tag: index 1 -> index 2
        body[0] = 0x24;
        let buf = v6_page(&[scene_block(2, Some((ITEM_LINE, body)), &[])]);
        assert!(matches!(
            decode_page(&buf),
            Err(DecodeError::TagMismatch { expected_index: 1, actual_index: 2, .. })
        ));
    }

    #[test]
    fn test_v6_corrupted_tag_type_fails() {
        let mut body = line_body(2, 15, 0, &[(1.0, 2.0)]);
        // thickness tag: 8-byte -> 4-byte wire type
        let thickness_tag = 1 + 4 + 1 + 4;
        assert_eq!(body[thickness_tag], 0x38);
        body[thickness_tag] = 0x34;
        let buf = v6_page(&[scene_block(2, Some((ITEM_LINE, body)), &[])]);
        assert!(matches!(
            decode_page(&buf),
            Err(DecodeError::TagMismatch { expected_type: 0x8, actual_type: 0x4, .. })
        ));
    }

    #[test]
    fn test_v6_corrupted_block_id_tag_fails() {
        let mut block = scene_block(2, None, &[]);
        // first id tag sits right after the 8-byte block header
        block[8] = 0x1C;
        assert!(matches!(
            decode_page(&v6_page(&[block])),
            Err(DecodeError::TagMismatch { .. })
        ));
    }

    #[test]
    fn test_v6_rejects_nonzero_reserved_byte() {
        let mut block = scene_block(2, None, &[]);
        block[4] = 1;
        assert!(matches!(
            decode_page(&v6_page(&[block])),
            Err(DecodeError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_v6_rejects_version_out_of_range() {
        let too_new = block(1, 1, 3, &[]);
        assert!(matches!(
            decode_page(&v6_page(&[too_new])),
            Err(DecodeError::InvalidBlock { .. })
        ));

        let inverted = block(1, 2, 1, &[]);
        assert!(matches!(
            decode_page(&v6_page(&[inverted])),
            Err(DecodeError::InvalidBlock { .. })
        ));
    }

    #[test]
    fn test_v6_truncated_block_fails() {
        let body = line_body(2, 15, 0, &[(1.0, 2.0)]);
        let mut buf = v6_page(&[scene_block(2, Some((ITEM_LINE, body)), &[])]);
        buf.truncate(buf.len() - 2);
        assert!(decode_page(&buf).is_err());
    }

    #[test]
    fn test_v6_empty_page() {
        let lines = decode_page(HEADER_V6.as_bytes()).unwrap();
        assert!(lines.is_empty());
    }
}
