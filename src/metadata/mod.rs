use crate::catalog::models::ImageMetadata;

/// Splits a raw tag list into structured fields and freeform tags.
///
/// A tag of the form `key:value` (colon not in first position) with a
/// recognized lower-cased key fills the matching structured field; the first
/// occurrence of a key wins for the whole batch. Everything else passes
/// through to the freeform list unchanged. Extraction never removes a tag
/// from searchability; callers link the full original list.
pub fn extract(tags: &[String]) -> (ImageMetadata, Vec<String>) {
    let mut metadata = ImageMetadata::default();
    let mut freeform = Vec::new();

    for tag in tags {
        let routed = match split_structured(tag) {
            Some((key, value)) => route_field(&mut metadata, &key, value),
            None => false,
        };

        if !routed {
            freeform.push(tag.clone());
        }
    }

    (metadata, freeform)
}

fn split_structured(tag: &str) -> Option<(String, &str)> {
    let colon = tag.find(':')?;
    if colon == 0 {
        return None;
    }
    let key = tag[..colon].to_lowercase();
    Some((key, &tag[colon + 1..]))
}

fn route_field(metadata: &mut ImageMetadata, key: &str, value: &str) -> bool {
    let slot = match key {
        "book" => &mut metadata.book,
        "page" => &mut metadata.page,
        "row" => &mut metadata.row,
        "column" => &mut metadata.column,
        "type" => &mut metadata.kind,
        "material" => &mut metadata.material,
        "width" => &mut metadata.width,
        "length" => &mut metadata.length,
        "remark" => &mut metadata.remark,
        "brand" => &mut metadata.brand,
        "color" => &mut metadata.color,
        "dimension" => return route_dimension(metadata, value),
        _ => return false,
    };

    if slot.is_none() {
        *slot = Some(value.to_string());
    }
    true
}

// Legacy compound key: "25x30mm" fills width=25, length=30. An unparseable
// value falls back to the freeform list so nothing is silently dropped.
fn route_dimension(metadata: &mut ImageMetadata, value: &str) -> bool {
    let Some((width, length)) = split_dimension(value) else {
        return false;
    };

    if metadata.width.is_none() {
        metadata.width = Some(width);
    }
    if metadata.length.is_none() {
        metadata.length = Some(length);
    }
    true
}

fn split_dimension(value: &str) -> Option<(String, String)> {
    let separator = value.find(['x', 'X'])?;
    let width = leading_number(value[..separator].trim())?;
    let length = leading_number(value[separator + 1..].trim())?;
    Some((width, length))
}

fn leading_number(token: &str) -> Option<String> {
    let mut end = 0;
    let mut seen_dot = false;

    for (index, character) in token.char_indices() {
        match character {
            '0'..='9' => end = index + 1,
            '.' if !seen_dot && end > 0 => {
                seen_dot = true;
                end = index + 1;
            }
            _ => break,
        }
    }

    if end == 0 {
        return None;
    }
    Some(token[..end].trim_end_matches('.').to_string())
}

#[cfg(test)]
mod tests {
    use super::*;

    fn tags(values: &[&str]) -> Vec<String> {
        values.iter().map(|value| value.to_string()).collect()
    }

    #[test]
    fn structured_keys_are_routed_and_the_rest_stays_freeform() {
        let (metadata, freeform) = extract(&tags(&["book:42", "rare", "velvet:blue"]));

        assert_eq!(metadata.book.as_deref(), Some("42"));
        assert_eq!(freeform, tags(&["rare", "velvet:blue"]));
    }

    #[test]
    fn key_match_is_case_insensitive_and_value_keeps_its_case() {
        let (metadata, freeform) = extract(&tags(&["Material:Wool Blend"]));

        assert_eq!(metadata.material.as_deref(), Some("Wool Blend"));
        assert!(freeform.is_empty());
    }

    #[test]
    fn first_write_wins_per_batch() {
        let (metadata, freeform) = extract(&tags(&["page:3", "page:7"]));

        assert_eq!(metadata.page.as_deref(), Some("3"));
        assert!(freeform.is_empty());
    }

    #[test]
    fn leading_colon_and_colonless_tags_are_freeform() {
        let (metadata, freeform) = extract(&tags(&[":orphan", "plain"]));

        assert_eq!(metadata, ImageMetadata::default());
        assert_eq!(freeform, tags(&[":orphan", "plain"]));
    }

    #[test]
    fn value_keeps_everything_after_the_first_colon() {
        let (metadata, _) = extract(&tags(&["remark:see shelf 4: left side"]));
        assert_eq!(metadata.remark.as_deref(), Some("see shelf 4: left side"));
    }

    #[test]
    fn dimension_splits_into_width_and_length() {
        let (metadata, freeform) = extract(&tags(&["dimension:25x30mm"]));

        assert_eq!(metadata.width.as_deref(), Some("25"));
        assert_eq!(metadata.length.as_deref(), Some("30"));
        assert!(freeform.is_empty());
    }

    #[test]
    fn fractional_dimensions_are_kept() {
        let (metadata, _) = extract(&tags(&["dimension:12.5 X 8.25 cm"]));

        assert_eq!(metadata.width.as_deref(), Some("12.5"));
        assert_eq!(metadata.length.as_deref(), Some("8.25"));
    }

    #[test]
    fn unparseable_dimension_falls_back_to_freeform() {
        let (metadata, freeform) = extract(&tags(&["dimension:huge"]));

        assert!(metadata.width.is_none());
        assert!(metadata.length.is_none());
        assert_eq!(freeform, tags(&["dimension:huge"]));
    }

    #[test]
    fn explicit_width_does_not_get_clobbered_by_dimension() {
        let (metadata, _) = extract(&tags(&["width:99", "dimension:25x30"]));

        assert_eq!(metadata.width.as_deref(), Some("99"));
        assert_eq!(metadata.length.as_deref(), Some("30"));
    }

    #[test]
    fn empty_input_yields_empty_outputs() {
        let (metadata, freeform) = extract(&[]);

        assert_eq!(metadata, ImageMetadata::default());
        assert!(freeform.is_empty());
    }
}
