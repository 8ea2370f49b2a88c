use shared::domain::{ProgrammingLanguage, SortDirection, SortKey};

pub fn cell(language: &ProgrammingLanguage, column: SortKey) -> String {
    match column {
        SortKey::Id => language.id.to_string(),
        SortKey::Name => language.name.clone(),
        SortKey::Creator => language.creator.clone(),
        SortKey::ReleaseYear => language.release_year.to_string(),
        SortKey::Paradigm => language.paradigm.clone(),
        SortKey::Popularity => language.popularity.to_string(),
    }
}

fn header(column: SortKey, sorted: Option<(SortKey, SortDirection)>) -> String {
    match sorted {
        Some((key, direction)) if key == column => {
            format!("{} {}", column.label(), direction.arrow())
        }
        _ => column.label().to_string(),
    }
}

/// Renders rows as a left-aligned text table; the sorted column's header
/// carries the direction arrow.
pub fn render(
    items: &[ProgrammingLanguage],
    sorted: Option<(SortKey, SortDirection)>,
) -> String {
    let headers: Vec<String> = SortKey::ALL
        .iter()
        .map(|column| header(*column, sorted))
        .collect();
    let rows: Vec<Vec<String>> = items
        .iter()
        .map(|item| SortKey::ALL.iter().map(|column| cell(item, *column)).collect())
        .collect();

    let widths: Vec<usize> = headers
        .iter()
        .enumerate()
        .map(|(idx, head)| {
            rows.iter()
                .map(|row| row[idx].chars().count())
                .chain(std::iter::once(head.chars().count()))
                .max()
                .unwrap_or(0)
        })
        .collect();

    let mut out = String::new();
    push_line(&mut out, &headers, &widths);
    let rule: Vec<String> = widths.iter().map(|width| "-".repeat(*width)).collect();
    push_line(&mut out, &rule, &widths);
    for row in &rows {
        push_line(&mut out, row, &widths);
    }
    out
}

fn push_line(out: &mut String, cells: &[String], widths: &[usize]) {
    let line = cells
        .iter()
        .zip(widths)
        .map(|(cell, width)| {
            let pad = width.saturating_sub(cell.chars().count());
            format!("{cell}{}", " ".repeat(pad))
        })
        .collect::<Vec<_>>()
        .join("  ");
    out.push_str(line.trim_end());
    out.push('\n');
}

#[cfg(test)]
mod tests {
    use shared::domain::LanguageId;

    use super::*;

    fn rust() -> ProgrammingLanguage {
        ProgrammingLanguage {
            id: LanguageId(7),
            name: "Rust".into(),
            creator: "Graydon Hoare".into(),
            release_year: 2015,
            paradigm: "Multi-paradigm".into(),
            popularity: 13.5,
        }
    }

    #[test]
    fn marks_sorted_column_with_arrow() {
        let out = render(&[rust()], Some((SortKey::Name, SortDirection::Descending)));
        let first = out.lines().next().expect("header");
        assert!(first.contains("Name ↓"));
        assert!(!first.contains("Creator ↓"));
        assert!(first.starts_with("ID"));
    }

    #[test]
    fn aligns_columns_to_widest_cell() {
        let mut go = rust();
        go.id = LanguageId(12);
        go.name = "Go".into();
        let out = render(&[rust(), go], None);
        let lines: Vec<&str> = out.lines().collect();
        assert_eq!(lines.len(), 4);
        let name_col = lines[0].find("Name").expect("name header");
        assert_eq!(lines[2].find("Rust"), Some(name_col));
        assert_eq!(lines[3].find("Go"), Some(name_col));
    }

    #[test]
    fn empty_table_still_has_headers() {
        let out = render(&[], None);
        assert_eq!(out.lines().count(), 2);
        assert!(out.contains("Popularity (%)"));
    }
}
