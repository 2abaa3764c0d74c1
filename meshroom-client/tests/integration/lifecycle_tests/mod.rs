mod test_stray_signal_dropped;
