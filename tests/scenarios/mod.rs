mod debounce_case1;
mod reconnect_case1;
mod teardown_case1;
mod visibility_case1;
