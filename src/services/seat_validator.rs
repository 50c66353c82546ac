use crate::models::DomeGeometry;

#[derive(Debug, Clone, PartialEq, Eq, thiserror::Error)]
pub enum SeatValidationError {
    #[error("{field} number must be in available range: (1, {bound_field}): (1, {bound})")]
    OutOfRange {
        field: &'static str,
        bound_field: &'static str,
        value: i32,
        bound: i32,
    },
}

impl SeatValidationError {
    /// Name of the ticket field that failed, `row` or `seat`.
    pub fn field(&self) -> &'static str {
        match self {
            Self::OutOfRange { field, .. } => field,
        }
    }
}

/// Checks that `(row, seat)` lies inside the dome's grid. Reports the first
/// violation, row before seat.
pub fn validate(row: i32, seat: i32, dome: &DomeGeometry) -> Result<(), SeatValidationError> {
    let checks = [
        (row, "row", "rows", dome.rows),
        (seat, "seat", "seats_in_row", dome.seats_in_row),
    ];

    for (value, field, bound_field, bound) in checks {
        if !(1..=bound).contains(&value) {
            return Err(SeatValidationError::OutOfRange {
                field,
                bound_field,
                value,
                bound,
            });
        }
    }

    Ok(())
}

#[cfg(test)]
mod tests {
    use super::*;

    const DOME: DomeGeometry = DomeGeometry::new(5, 10);

    #[test]
    fn accepts_corners_of_the_grid() {
        for (row, seat) in [(1, 1), (1, 10), (5, 1), (5, 10)] {
            assert_eq!(validate(row, seat, &DOME), Ok(()), "({row}, {seat})");
        }
    }

    #[test]
    fn rejects_row_outside_grid() {
        for row in [0, 6, -1] {
            let err = validate(row, 1, &DOME).unwrap_err();
            assert_eq!(err.field(), "row");
        }
    }

    #[test]
    fn rejects_seat_outside_grid() {
        for seat in [0, 11] {
            let err = validate(1, seat, &DOME).unwrap_err();
            assert_eq!(err.field(), "seat");
        }
    }

    #[test]
    fn row_is_reported_first() {
        let err = validate(0, 0, &DOME).unwrap_err();
        assert_eq!(err.field(), "row");
    }

    #[test]
    fn message_names_field_and_range() {
        let err = validate(1, 11, &DOME).unwrap_err();
        assert_eq!(
            err.to_string(),
            "seat number must be in available range: (1, seats_in_row): (1, 10)"
        );
    }
}
