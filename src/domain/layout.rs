use serde::Serialize;

use crate::domain::BookingError;
use crate::entities::bus_type;

/// Prefix carried by every seat code on the upper floor.
pub const UPPER_FLOOR_PREFIX: &str = "U-";

/// Position of one seat inside a bus type's grid.
#[derive(Debug, Clone, PartialEq, Eq, Serialize)]
pub struct SeatPosition {
    pub code: String,
    pub floor: i32,
    pub row_index: i32,
    pub col_index: i32,
}

/// Generate the ordered seat list of a bus type.
///
/// Ground-floor seats are named by row letter and 1-based column (`A1`,
/// `A2`, ..., `AA1` after `Z`). Upper-floor seats use the same scheme behind
/// [`UPPER_FLOOR_PREFIX`], e.g. `U-A1`.
pub fn generate_layout(bus_type: &bus_type::Model) -> Result<Vec<SeatPosition>, BookingError> {
    if bus_type.rows <= 0 || bus_type.cols <= 0 {
        return Err(BookingError::InvalidLayout(format!(
            "rows and cols must be positive, got {}x{}",
            bus_type.rows, bus_type.cols
        )));
    }

    let upper = if bus_type.has_second_floor {
        if bus_type.floor_rows <= 0 || bus_type.floor_cols <= 0 {
            return Err(BookingError::InvalidLayout(format!(
                "second floor dimensions must be positive, got {}x{}",
                bus_type.floor_rows, bus_type.floor_cols
            )));
        }
        Some((bus_type.floor_rows, bus_type.floor_cols))
    } else {
        if bus_type.floor_rows != 0 || bus_type.floor_cols != 0 {
            return Err(BookingError::InvalidLayout(
                "floor dimensions given for a single-floor bus type".to_string(),
            ));
        }
        None
    };

    let expected = grid_size(bus_type.rows, bus_type.cols)
        .zip(upper.map_or(Some(0), |(r, c)| grid_size(r, c)))
        .and_then(|(lower, upper)| lower.checked_add(upper))
        .ok_or_else(|| BookingError::InvalidLayout("layout is too large".to_string()))?;

    if i64::from(bus_type.total_seats) != expected {
        return Err(BookingError::InvalidLayout(format!(
            "total_seats is {} but the grid holds {}",
            bus_type.total_seats, expected
        )));
    }

    let mut seats = Vec::with_capacity(expected as usize);
    push_floor(&mut seats, 1, bus_type.rows, bus_type.cols);
    if let Some((rows, cols)) = upper {
        push_floor(&mut seats, 2, rows, cols);
    }

    Ok(seats)
}

fn grid_size(rows: i32, cols: i32) -> Option<i64> {
    i64::from(rows).checked_mul(i64::from(cols))
}

fn push_floor(seats: &mut Vec<SeatPosition>, floor: i32, rows: i32, cols: i32) {
    let prefix = if floor == 2 { UPPER_FLOOR_PREFIX } else { "" };
    for row in 0..rows {
        let label = row_label(row as usize);
        for col in 0..cols {
            seats.push(SeatPosition {
                code: format!("{}{}{}", prefix, label, col + 1),
                floor,
                row_index: row,
                col_index: col,
            });
        }
    }
}

/// Spreadsheet-style row label: 0 -> A, 25 -> Z, 26 -> AA.
pub fn row_label(mut index: usize) -> String {
    let mut label = Vec::new();
    loop {
        label.push(char::from(b'A' + (index % 26) as u8));
        if index < 26 {
            break;
        }
        index = index / 26 - 1;
    }
    label.iter().rev().collect()
}

/// Parse a seat code back into its grid position.
pub fn parse_seat_code(code: &str) -> Option<SeatPosition> {
    let (floor, rest) = match code.strip_prefix(UPPER_FLOOR_PREFIX) {
        Some(rest) => (2, rest),
        None => (1, code),
    };

    let split = rest.find(|c: char| c.is_ascii_digit())?;
    let (letters, digits) = rest.split_at(split);
    if letters.is_empty() || !letters.bytes().all(|b| b.is_ascii_uppercase()) {
        return None;
    }
    if digits.is_empty() || !digits.bytes().all(|b| b.is_ascii_digit()) || digits.starts_with('0')
    {
        return None;
    }

    let mut row: usize = 0;
    for b in letters.bytes() {
        row = row.checked_mul(26)?.checked_add(usize::from(b - b'A') + 1)?;
    }
    let col: i32 = digits.parse().ok()?;

    Some(SeatPosition {
        code: code.to_string(),
        floor,
        row_index: i32::try_from(row - 1).ok()?,
        col_index: col - 1,
    })
}

/// Whether `code` names a seat inside the bus type's grid.
pub fn is_valid_seat_code(bus_type: &bus_type::Model, code: &str) -> bool {
    let Some(pos) = parse_seat_code(code) else {
        return false;
    };
    let (rows, cols) = match pos.floor {
        1 => (bus_type.rows, bus_type.cols),
        2 if bus_type.has_second_floor => (bus_type.floor_rows, bus_type.floor_cols),
        _ => return false,
    };
    pos.row_index < rows && pos.col_index < cols
}
