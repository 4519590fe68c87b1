//! Order-book record model and the output column contract.

/// How the spreadsheet sink should coerce a column.
#[derive(Clone, Copy, Debug, PartialEq, Eq)]
pub enum ColumnKind {
    Numeric,
    Date,
    Text,
}

/// Output columns, in the order they are written.
#[derive(Clone, Copy, Debug, PartialEq, Eq, Hash)]
pub enum Column {
    BidPrice,
    Orders,
    Qty,
    Offer,
    Orders1,
    Qty1,
    Open,
    High,
    Low,
    PrevClose,
    Volume,
    AvgPrice,
    LowerCircuit,
    UpperCircuit,
    Ltq,
    Ltt,
}

impl Column {
    pub const ALL: [Column; 16] = [
        Column::BidPrice,
        Column::Orders,
        Column::Qty,
        Column::Offer,
        Column::Orders1,
        Column::Qty1,
        Column::Open,
        Column::High,
        Column::Low,
        Column::PrevClose,
        Column::Volume,
        Column::AvgPrice,
        Column::LowerCircuit,
        Column::UpperCircuit,
        Column::Ltq,
        Column::Ltt,
    ];

    /// Header text in the spreadsheet.
    pub fn name(self) -> &'static str {
        match self {
            Column::BidPrice => "Bid Price",
            Column::Orders => "Orders",
            Column::Qty => "QTY",
            Column::Offer => "Offer",
            Column::Orders1 => "Orders1",
            Column::Qty1 => "QTY1",
            Column::Open => "Open",
            Column::High => "High",
            Column::Low => "Low",
            Column::PrevClose => "Prev.Close",
            Column::Volume => "Volume",
            Column::AvgPrice => "Avg.Price",
            Column::LowerCircuit => "Lower circuit",
            Column::UpperCircuit => "Upper circuit",
            Column::Ltq => "LTQ",
            Column::Ltt => "LTT",
        }
    }

    pub fn kind(self) -> ColumnKind {
        match self {
            Column::BidPrice
            | Column::Qty
            | Column::Open
            | Column::Low
            | Column::Ltq
            | Column::LowerCircuit
            | Column::High
            | Column::PrevClose
            | Column::Volume
            | Column::AvgPrice
            | Column::UpperCircuit => ColumnKind::Numeric,
            Column::Ltt => ColumnKind::Date,
            Column::Orders | Column::Offer | Column::Orders1 | Column::Qty1 => ColumnKind::Text,
        }
    }

    /// Looks a column up by its header text.
    pub fn from_name(name: &str) -> Option<Column> {
        Column::ALL.into_iter().find(|c| c.name() == name.trim())
    }

    /// Position in `Column::ALL`.
    pub fn index(self) -> usize {
        self as usize
    }
}

/// Single-row market summary shown under the book.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct Summary {
    pub open: String,
    pub high: String,
    pub low: String,
    pub prev_close: String,
    /// Thousands separators removed
    pub volume: String,
    pub avg_price: String,
    pub lower_circuit: String,
    pub upper_circuit: String,
    pub ltq: String,
    pub ltt: String,
}

/// One depth-of-market row. The first row of a sampled frame also carries
/// the summary.
#[derive(Clone, Debug, Default, PartialEq, Eq)]
pub struct OrderBookRecord {
    /// Thousands separators removed
    pub bid_price: String,
    pub orders: String,
    pub qty: String,
    pub offer: String,
    pub orders1: String,
    pub qty1: String,
    pub summary: Option<Summary>,
}

impl OrderBookRecord {
    /// Value of one column, `None` where the row has no such field.
    pub fn get(&self, column: Column) -> Option<&str> {
        let summary = self.summary.as_ref();
        match column {
            Column::BidPrice => Some(self.bid_price.as_str()),
            Column::Orders => Some(self.orders.as_str()),
            Column::Qty => Some(self.qty.as_str()),
            Column::Offer => Some(self.offer.as_str()),
            Column::Orders1 => Some(self.orders1.as_str()),
            Column::Qty1 => Some(self.qty1.as_str()),
            Column::Open => summary.map(|s| s.open.as_str()),
            Column::High => summary.map(|s| s.high.as_str()),
            Column::Low => summary.map(|s| s.low.as_str()),
            Column::PrevClose => summary.map(|s| s.prev_close.as_str()),
            Column::Volume => summary.map(|s| s.volume.as_str()),
            Column::AvgPrice => summary.map(|s| s.avg_price.as_str()),
            Column::LowerCircuit => summary.map(|s| s.lower_circuit.as_str()),
            Column::UpperCircuit => summary.map(|s| s.upper_circuit.as_str()),
            Column::Ltq => summary.map(|s| s.ltq.as_str()),
            Column::Ltt => summary.map(|s| s.ltt.as_str()),
        }
    }

    /// Every output column with its value, in output order.
    pub fn fields(&self) -> impl Iterator<Item = (Column, Option<&str>)> + '_ {
        Column::ALL.into_iter().map(move |c| (c, self.get(c)))
    }

    /// Number of fields this row actually carries.
    pub fn field_count(&self) -> usize {
        self.fields().filter(|(_, v)| v.is_some()).count()
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn test_column_names_round_trip() {
        for column in Column::ALL {
            assert_eq!(Column::from_name(column.name()), Some(column));
        }
        assert_eq!(Column::from_name("Volumn"), None);
        assert_eq!(Column::from_name(" LTT "), Some(Column::Ltt));
    }

    #[test]
    fn test_column_index_matches_output_order() {
        for (i, column) in Column::ALL.into_iter().enumerate() {
            assert_eq!(column.index(), i);
        }
    }

    #[test]
    fn test_column_kinds() {
        let numeric: Vec<&str> = Column::ALL
            .into_iter()
            .filter(|c| c.kind() == ColumnKind::Numeric)
            .map(Column::name)
            .collect();
        assert_eq!(
            numeric,
            vec![
                "Bid Price",
                "QTY",
                "Open",
                "High",
                "Low",
                "Prev.Close",
                "Volume",
                "Avg.Price",
                "Lower circuit",
                "Upper circuit",
                "LTQ"
            ]
        );
        assert_eq!(Column::Ltt.kind(), ColumnKind::Date);
        assert_eq!(Column::Qty1.kind(), ColumnKind::Text);
        assert_eq!(Column::Orders.kind(), ColumnKind::Text);
    }

    #[test]
    fn test_plain_row_has_six_fields() {
        let record = OrderBookRecord {
            bid_price: "2450.10".to_string(),
            ..OrderBookRecord::default()
        };
        assert_eq!(record.field_count(), 6);
        assert_eq!(record.get(Column::BidPrice), Some("2450.10"));
        assert_eq!(record.get(Column::Open), None);
    }

    #[test]
    fn test_first_row_has_sixteen_fields() {
        let record = OrderBookRecord {
            summary: Some(Summary {
                ltt: "15:29:59".to_string(),
                ..Summary::default()
            }),
            ..OrderBookRecord::default()
        };
        assert_eq!(record.field_count(), 16);
        assert_eq!(record.get(Column::Ltt), Some("15:29:59"));
    }
}
