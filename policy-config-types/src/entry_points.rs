use policy_message::SmtpState;

/// One slot per distinct transaction category (spec §3: Connect,
/// Helo/Ehlo, Mail, Rcpt, Data, EndOfMessage, Vrfy, Etrn), indexed by
/// [`SmtpState::rank`].
const NUM_CATEGORIES: usize = 8;

#[derive(Clone, Debug, Default)]
pub struct EntryPoints {
    filter: [Option<usize>; NUM_CATEGORIES],
}

impl EntryPoints {
    pub fn new() -> EntryPoints {
        EntryPoints {
            filter: [None; NUM_CATEGORIES],
        }
    }

    pub fn set(&mut self, state: SmtpState, filter_index: usize) {
        self.filter[state.rank() as usize] = Some(filter_index);
    }

    pub fn get(&self, state: SmtpState) -> Option<usize> {
        self.filter[state.rank() as usize]
    }

    pub fn iter(&self) -> impl Iterator<Item = usize> + '_ {
        self.filter.iter().filter_map(|f| *f)
    }
}

#[cfg(test)]
mod tests {
    use super::*;

    #[test]
    fn helo_and_ehlo_share_one_entry_point() {
        let mut ep = EntryPoints::new();
        ep.set(SmtpState::Helo { ehlo: false }, 3);
        assert_eq!(ep.get(SmtpState::Helo { ehlo: true }), Some(3));
    }

    #[test]
    fn unset_category_is_none() {
        assert_eq!(EntryPoints::new().get(SmtpState::Rcpt), None);
    }
}
