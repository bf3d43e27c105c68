/// Letter grade for a mark out of 100. Thresholds are inclusive lower bounds,
/// checked highest first.
pub fn grade_for_marks(marks: i64) -> &'static str {
    match marks {
        m if m >= 90 => "A+",
        m if m >= 85 => "A",
        m if m >= 80 => "A-",
        m if m >= 75 => "B+",
        m if m >= 70 => "B",
        m if m >= 65 => "B-",
        m if m >= 60 => "C+",
        m if m >= 55 => "C",
        m if m >= 50 => "C-",
        m if m >= 45 => "D+",
        m if m >= 40 => "D",
        _ => "F",
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn boundaries_map_to_expected_letters() {
        let expected = [
            (90, "A+"),
            (85, "A"),
            (80, "A-"),
            (75, "B+"),
            (70, "B"),
            (65, "B-"),
            (60, "C+"),
            (55, "C"),
            (50, "C-"),
            (45, "D+"),
            (40, "D"),
            (39, "F"),
            (0, "F"),
        ];
        for (marks, grade) in expected {
            assert_eq!(grade_for_marks(marks), grade, "marks={}", marks);
        }
    }

    #[test]
    fn one_below_each_boundary_drops_a_step() {
        assert_eq!(grade_for_marks(89), "A");
        assert_eq!(grade_for_marks(84), "A-");
        assert_eq!(grade_for_marks(44), "D");
    }
}
