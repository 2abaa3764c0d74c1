mod test_candidate_before_offer;
mod test_duplicate_answer_ignored;
mod test_two_peers_negotiate_once;
